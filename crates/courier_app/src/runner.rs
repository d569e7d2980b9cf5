//! Sequential multi-article runs: one fresh session per article.

use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Article, PublishOutcome};
use courier_engine::{BrowserLauncher, Orchestrator};
use courier_logging::{courier_info, courier_warn};

use crate::ledger::PublishedLedger;
use crate::notifier::Notifier;

#[async_trait(?Send)]
pub trait ArticlePublisher {
    async fn publish(&self, article: &Article) -> PublishOutcome;
}

#[async_trait(?Send)]
impl<L: BrowserLauncher> ArticlePublisher for Orchestrator<L> {
    async fn publish(&self, article: &Article) -> PublishOutcome {
        Orchestrator::publish(self, article).await
    }
}

#[derive(Debug, Clone)]
pub struct RunItem {
    /// Identifier in the ledger, normally the source file path.
    pub source: String,
    pub article: Article,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub source: String,
    pub title: String,
    /// `None` when the ledger already listed the article.
    pub outcome: Option<PublishOutcome>,
}

impl RunResult {
    pub fn finished(source: &str, title: &str, outcome: PublishOutcome) -> Self {
        Self {
            source: source.to_string(),
            title: title.to_string(),
            outcome: Some(outcome),
        }
    }

    pub fn already_published(source: &str, title: &str) -> Self {
        Self {
            source: source.to_string(),
            title: title.to_string(),
            outcome: None,
        }
    }

    pub fn skipped(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.succeeded)
    }

    pub fn failed(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| !o.succeeded)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub interval: Duration,
    /// Publish even when the ledger lists the source.
    pub force: bool,
}

pub async fn run_all<P: ArticlePublisher>(
    publisher: &P,
    items: Vec<RunItem>,
    ledger: &mut PublishedLedger,
    notifier: &dyn Notifier,
    options: RunOptions,
) -> Vec<RunResult> {
    let mut results = Vec::with_capacity(items.len());
    let mut attempted = 0usize;

    for item in items {
        let title = item.article.title().to_string();
        if !options.force && ledger.contains(&item.source) {
            courier_info!("'{}' already published from {}, skipping", title, item.source);
            results.push(RunResult::already_published(&item.source, &title));
            continue;
        }

        if attempted > 0 && !options.interval.is_zero() {
            courier_info!("waiting {}s before the next article", options.interval.as_secs());
            tokio::time::sleep(options.interval).await;
        }
        attempted += 1;

        let outcome = publisher.publish(&item.article).await;
        notifier.article_done(&title, &outcome);
        if outcome.succeeded {
            if let Err(err) = ledger.record(&item.source, &title) {
                courier_warn!("ledger not updated for {}: {err}", item.source);
            }
        }
        results.push(RunResult::finished(&item.source, &title, outcome));
    }

    if results.len() > 1 {
        notifier.summary(&results);
    }
    results
}
