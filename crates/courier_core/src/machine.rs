use std::fmt;

use crate::{Intent, Stage};

/// Why a stage did not go as planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    AuthenticationFailure,
    RequiredControlNotFound { intent: Intent },
    OptionalControlNotFound { intent: Intent },
    MarkerNotFound,
    UploadNotConfirmed,
    Navigation,
    Driver,
}

impl FailureKind {
    /// Whether this failure ends the attempt when it happens in `stage`.
    pub fn is_fatal_in(self, stage: Stage) -> bool {
        match self {
            FailureKind::AuthenticationFailure
            | FailureKind::RequiredControlNotFound { .. }
            | FailureKind::Navigation => true,
            FailureKind::OptionalControlNotFound { .. }
            | FailureKind::MarkerNotFound
            | FailureKind::UploadNotConfirmed => false,
            FailureKind::Driver => !stage.is_optional(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::AuthenticationFailure => write!(f, "authentication failed"),
            FailureKind::RequiredControlNotFound { intent } => {
                write!(f, "required control not found: {intent}")
            }
            FailureKind::OptionalControlNotFound { intent } => {
                write!(f, "optional control not found: {intent}")
            }
            FailureKind::MarkerNotFound => write!(f, "publish marker not found"),
            FailureKind::UploadNotConfirmed => write!(f, "image upload not confirmed"),
            FailureKind::Navigation => write!(f, "navigation failed"),
            FailureKind::Driver => write!(f, "browser driver error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl StageFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

/// What a completed stage reports back. `notes` carries soft failures the
/// stage absorbed without giving up (a missing price field, a marker
/// fallback).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    pub notes: Vec<StageFailure>,
}

impl StageReport {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, note: StageFailure) -> Self {
        self.notes.push(note);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub detail: String,
}

impl fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.kind)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    InProgress,
    Succeeded,
    Aborted,
}

/// Result of feeding one stage result to a [`PublishRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Run the next stage.
    Continue(Stage),
    /// Every planned stage has been recorded and none aborted.
    Completed,
    /// A fatal failure ended the run in this stage.
    Aborted(Stage),
    /// The recorded stage is not the one the run is waiting for. Ignored.
    OutOfOrder { expected: Option<Stage>, got: Stage },
}

/// Forward-only bookkeeping for one publish attempt.
///
/// The caller executes stages; the run only decides what happens next from
/// each result. Soft failures mark the stage as skipped and move on, fatal
/// ones stop the run for good.
#[derive(Debug, Clone)]
pub struct PublishRun {
    plan: Vec<Stage>,
    cursor: usize,
    status: RunStatus,
    history: Vec<StageRecord>,
    soft_failures: Vec<SoftFailure>,
    fatal: Option<(Stage, StageFailure)>,
}

impl PublishRun {
    pub fn new(plan: Vec<Stage>) -> Self {
        let status = if plan.is_empty() {
            RunStatus::Succeeded
        } else {
            RunStatus::InProgress
        };
        Self {
            plan,
            cursor: 0,
            status,
            history: Vec::new(),
            soft_failures: Vec::new(),
            fatal: None,
        }
    }

    pub fn plan(&self) -> &[Stage] {
        &self.plan
    }

    /// The stage waiting to be executed, if the run is still in progress.
    pub fn current(&self) -> Option<Stage> {
        match self.status {
            RunStatus::InProgress => self.plan.get(self.cursor).copied(),
            _ => None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status != RunStatus::InProgress
    }

    pub fn record(&mut self, stage: Stage, result: Result<StageReport, StageFailure>) -> Transition {
        let expected = self.current();
        if expected != Some(stage) {
            return Transition::OutOfOrder {
                expected,
                got: stage,
            };
        }

        match result {
            Ok(report) => {
                for note in report.notes {
                    self.push_soft(stage, note);
                }
                self.history.push(StageRecord {
                    stage,
                    status: StageStatus::Completed,
                });
            }
            Err(failure) if failure.kind.is_fatal_in(stage) => {
                self.history.push(StageRecord {
                    stage,
                    status: StageStatus::Failed,
                });
                self.fatal = Some((stage, failure));
                self.status = RunStatus::Aborted;
                return Transition::Aborted(stage);
            }
            Err(failure) => {
                self.push_soft(stage, failure);
                self.history.push(StageRecord {
                    stage,
                    status: StageStatus::Skipped,
                });
            }
        }

        self.cursor += 1;
        match self.plan.get(self.cursor) {
            Some(&next) => Transition::Continue(next),
            None => {
                self.status = RunStatus::Succeeded;
                Transition::Completed
            }
        }
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    pub fn soft_failures(&self) -> &[SoftFailure] {
        &self.soft_failures
    }

    /// Last stage that completed.
    pub fn stage_reached(&self) -> Option<Stage> {
        self.history
            .iter()
            .rev()
            .find(|record| record.status == StageStatus::Completed)
            .map(|record| record.stage)
    }

    pub fn aborted_at(&self) -> Option<Stage> {
        self.fatal.as_ref().map(|(stage, _)| *stage)
    }

    pub fn fatal(&self) -> Option<&StageFailure> {
        self.fatal.as_ref().map(|(_, failure)| failure)
    }

    /// Whether `stage` was entered at all, whatever its result.
    pub fn entered(&self, stage: Stage) -> bool {
        self.history.iter().any(|record| record.stage == stage)
    }

    fn push_soft(&mut self, stage: Stage, failure: StageFailure) {
        self.soft_failures.push(SoftFailure {
            stage,
            kind: failure.kind,
            detail: failure.detail,
        });
    }
}
