#![deny(missing_docs)]
//! Shared logging utilities for the courier workspace.
//!
//! This crate provides the `courier_*` logging macros used across the codebase,
//! a per-thread run label that ties log lines and diagnostics of one publish
//! attempt together, and a minimal test initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Label of the publish attempt currently driven on this thread.
    static RUN_LABEL: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the run label for the current thread.
/// The orchestrator calls this once at the start of every publish attempt.
pub fn set_run_label(label: impl Into<String>) {
    let label = label.into();
    RUN_LABEL.with(|v| *v.borrow_mut() = label);
}

/// Retrieves the run label for the current thread.
/// Returns `"-"` if no attempt has been started.
pub fn run_label() -> String {
    RUN_LABEL.with(|v| {
        let label = v.borrow();
        if label.is_empty() {
            "-".to_string()
        } else {
            label.clone()
        }
    })
}

/// Logs a trace-level message, prefixed with the current run label.
#[macro_export]
macro_rules! courier_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message, prefixed with the current run label.
#[macro_export]
macro_rules! courier_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message, prefixed with the current run label.
#[macro_export]
macro_rules! courier_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message, prefixed with the current run label.
#[macro_export]
macro_rules! courier_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message, prefixed with the current run label.
#[macro_export]
macro_rules! courier_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::run_label(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
