use std::path::PathBuf;

use crate::{PublishRun, RunStatus, SoftFailure, Stage, StageRecord};

/// Everything one `publish()` call has to say. Built once from the finished
/// run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub succeeded: bool,
    pub stage_reached: Option<Stage>,
    pub aborted_at: Option<Stage>,
    pub diagnostics_paths: Vec<PathBuf>,
    pub error_detail: Option<String>,
    pub backup_path: Option<PathBuf>,
    pub soft_failures: Vec<SoftFailure>,
    pub history: Vec<StageRecord>,
}

impl PublishOutcome {
    pub fn from_run(
        run: &PublishRun,
        diagnostics_paths: Vec<PathBuf>,
        backup_path: Option<PathBuf>,
    ) -> Self {
        Self {
            succeeded: run.status() == RunStatus::Succeeded,
            stage_reached: run.stage_reached(),
            aborted_at: run.aborted_at(),
            diagnostics_paths,
            error_detail: run.fatal().map(ToString::to_string),
            backup_path,
            soft_failures: run.soft_failures().to_vec(),
            history: run.history().to_vec(),
        }
    }

    /// Failure before any stage could run, e.g. the browser did not start.
    pub fn not_started(
        detail: impl Into<String>,
        diagnostics_paths: Vec<PathBuf>,
        backup_path: Option<PathBuf>,
    ) -> Self {
        Self {
            succeeded: false,
            stage_reached: None,
            aborted_at: None,
            diagnostics_paths,
            error_detail: Some(detail.into()),
            backup_path,
            soft_failures: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn entered(&self, stage: Stage) -> bool {
        self.history.iter().any(|record| record.stage == stage)
    }
}
