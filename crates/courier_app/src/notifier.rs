use courier_core::PublishOutcome;
use courier_logging::{courier_error, courier_info};

use crate::runner::RunResult;

/// Receives completion messages. The production sink writes to the log; a
/// chat or mail integration would implement the same trait.
pub trait Notifier {
    fn article_done(&self, title: &str, outcome: &PublishOutcome);
    fn summary(&self, results: &[RunResult]);
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn article_done(&self, title: &str, outcome: &PublishOutcome) {
        if outcome.succeeded {
            courier_info!("{}", article_message(title, outcome));
        } else {
            courier_error!("{}", article_message(title, outcome));
        }
    }

    fn summary(&self, results: &[RunResult]) {
        for line in summary_text(results).lines() {
            courier_info!("{line}");
        }
    }
}

pub fn article_message(title: &str, outcome: &PublishOutcome) -> String {
    if outcome.succeeded {
        let mut message = format!("published: {title}");
        if !outcome.soft_failures.is_empty() {
            message.push_str(&format!(" ({} step(s) skipped)", outcome.soft_failures.len()));
        }
        return message;
    }
    let detail = outcome.error_detail.as_deref().unwrap_or("unknown error");
    match outcome.aborted_at {
        Some(stage) => format!("failed: {title} at {stage}: {detail}"),
        None => format!("failed: {title}: {detail}"),
    }
}

pub fn summary_text(results: &[RunResult]) -> String {
    let published = results.iter().filter(|r| r.succeeded()).count();
    let skipped = results.iter().filter(|r| r.skipped()).count();
    let failed = results.len() - published - skipped;

    let mut text = format!(
        "run finished: {published} published, {failed} failed, {skipped} skipped"
    );
    for result in results.iter().filter(|r| r.failed()) {
        text.push_str(&format!("\n- {} ({})", result.title, result.source));
    }
    text
}
