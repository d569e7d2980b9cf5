use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_logging::{courier_info, courier_warn};

use crate::{ensure_output_dir, PageDriver};

const LOG_FILE: &str = "diagnostics.log";

/// Screenshots and log lines for one publish attempt.
///
/// Every failure in here is logged and swallowed: a broken disk or a hung
/// page must not change what the publisher does next.
pub struct DiagnosticsSink {
    dir: PathBuf,
    run: String,
    seq: usize,
    capture_timeout: Duration,
    paths: Vec<PathBuf>,
}

impl DiagnosticsSink {
    pub fn new(dir: impl Into<PathBuf>, run: impl Into<String>, capture_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            run: run.into(),
            seq: 0,
            capture_timeout,
            paths: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `{dir}/{run}-{seq:02}-{label}.png` and logs the capture.
    pub async fn capture<P: PageDriver>(&mut self, page: &P, label: &str) -> Option<PathBuf> {
        self.seq += 1;
        let file = self.dir.join(format!(
            "{}-{:02}-{}.png",
            self.run,
            self.seq,
            sanitize_label(label)
        ));

        if let Err(err) = ensure_output_dir(&self.dir) {
            courier_warn!("diagnostics: {err}");
            return None;
        }
        let saved = match tokio::time::timeout(self.capture_timeout, page.screenshot(&file)).await {
            Ok(Ok(())) => Some(file),
            Ok(Err(err)) => {
                courier_warn!("diagnostics: screenshot '{label}' failed: {err}");
                None
            }
            Err(_) => {
                courier_warn!("diagnostics: screenshot '{label}' timed out");
                None
            }
        };

        let shown = saved
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "no image".to_string());
        self.note(label, &shown);

        if let Some(path) = &saved {
            self.paths.push(path.clone());
        }
        saved
    }

    /// Log line only, to the log facade and `diagnostics.log`.
    pub fn note(&self, label: &str, message: &str) {
        courier_info!("diagnostics [{label}] {message}");
        if let Err(err) = ensure_output_dir(&self.dir) {
            courier_warn!("diagnostics: {err}");
            return;
        }
        let line = format!(
            "{} {} [{label}] {message}\n",
            chrono::Local::now().to_rfc3339(),
            self.run
        );
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(LOG_FILE))
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = appended {
            courier_warn!("diagnostics: cannot append to {LOG_FILE}: {err}");
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "capture".to_string()
    } else {
        cleaned.to_string()
    }
}
