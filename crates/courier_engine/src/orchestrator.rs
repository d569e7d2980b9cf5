use std::path::PathBuf;
use std::sync::Arc;

use courier_core::{Article, PublishOutcome, StrategyBook};
use courier_logging::{courier_error, courier_info, courier_warn, set_run_label};

use crate::{
    BackupStore, BrowserLauncher, Credentials, DiagnosticsSink, ElementResolver,
    PublishSettings, PublishStateMachine, SessionAuthenticator,
};

/// Entry point of a publish attempt: backup, fresh browser, state machine,
/// teardown.
pub struct Orchestrator<L: BrowserLauncher> {
    launcher: L,
    resolver: Arc<ElementResolver>,
    machine: PublishStateMachine,
    credentials: Credentials,
    backups: BackupStore,
    diagnostics_dir: PathBuf,
}

impl<L: BrowserLauncher> Orchestrator<L> {
    pub fn new(
        launcher: L,
        book: StrategyBook,
        settings: PublishSettings,
        credentials: Credentials,
        backup_dir: PathBuf,
        diagnostics_dir: PathBuf,
    ) -> Self {
        let resolver = Arc::new(ElementResolver::new(book));
        Self {
            launcher,
            machine: PublishStateMachine::new(resolver.clone(), settings),
            resolver,
            credentials,
            backups: BackupStore::new(backup_dir),
            diagnostics_dir,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    fn settings(&self) -> &PublishSettings {
        self.machine.settings()
    }

    /// Publishes one article in its own browser session. Never panics and
    /// never returns early without an outcome.
    pub async fn publish(&self, article: &Article) -> PublishOutcome {
        let run_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        set_run_label(run_id.clone());
        courier_info!("publishing '{}'", article.title());

        let backup_path = match self.backups.save(article, &run_id) {
            Ok(path) => {
                courier_info!("backup written to {}", path.display());
                Some(path)
            }
            Err(err) => {
                courier_warn!("backup failed: {err}");
                None
            }
        };

        let mut diagnostics = DiagnosticsSink::new(
            self.diagnostics_dir.clone(),
            run_id,
            self.settings().capture_timeout,
        );

        let page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(err) => {
                courier_error!("browser launch failed: {err}");
                diagnostics.note("launch", &err.to_string());
                return PublishOutcome::not_started(
                    format!("browser launch failed: {err}"),
                    diagnostics.into_paths(),
                    backup_path,
                );
            }
        };

        let mut auth = SessionAuthenticator::new(self.resolver.clone(), self.settings());
        let run = self
            .machine
            .run(&page, article, &mut auth, &self.credentials, &mut diagnostics)
            .await;

        if let Err(err) = self.launcher.close(page).await {
            courier_warn!("browser did not close cleanly: {err}");
        }

        let outcome = PublishOutcome::from_run(&run, diagnostics.into_paths(), backup_path);
        if outcome.succeeded {
            courier_info!("'{}' published", article.title());
        } else {
            courier_error!(
                "'{}' not published: {}",
                article.title(),
                outcome.error_detail.as_deref().unwrap_or("unknown error")
            );
        }
        outcome
    }

    /// Logs in on a fresh session and reports whether it worked.
    pub async fn authenticate_only(&self) -> bool {
        set_run_label("login-check");
        let page = match self.launcher.launch().await {
            Ok(page) => page,
            Err(err) => {
                courier_error!("browser launch failed: {err}");
                return false;
            }
        };

        let mut auth = SessionAuthenticator::new(self.resolver.clone(), self.settings());
        let result = auth.authenticate(&page, &self.credentials).await;
        if let Err(err) = self.launcher.close(page).await {
            courier_warn!("browser did not close cleanly: {err}");
        }

        match result {
            Ok(session) => {
                courier_info!("login ok for {}", session.identity);
                true
            }
            Err(err) => {
                courier_error!("login failed: {err}");
                false
            }
        }
    }
}
