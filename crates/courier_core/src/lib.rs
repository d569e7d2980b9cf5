//! Courier core: pure publishing domain, free of browser and filesystem IO.
mod article;
mod backup;
mod collaborators;
mod machine;
mod marker;
mod outcome;
mod sanitize;
mod split;
mod stage;
mod strategy;

pub use article::Article;
pub use backup::{parse_backup, render_backup, BackupDocument, BackupError};
pub use collaborators::{
    prepare_article, CollaboratorError, ContentGenerator, GeneratedArticle, ImageGenerator,
};
pub use machine::{
    FailureKind, PublishRun, RunStatus, SoftFailure, StageFailure, StageRecord, StageReport,
    StageStatus, Transition,
};
pub use marker::{MarkerScan, PublishMarker, DEFAULT_FALLBACK_PHRASES, DEFAULT_SENTINEL};
pub use outcome::PublishOutcome;
pub use sanitize::sanitize;
pub use split::{choose_split_control, pick_price_field, FallbackReason, SplitChoice};
pub use stage::{plan_for, Stage};
pub use strategy::{Intent, ResolutionStrategy, StrategyBook, StrategyKind};
