//! Courier engine: drives the note.com editor through a browser page.
mod auth;
mod chromium;
mod diagnostics;
mod driver;
mod orchestrator;
mod persist;
mod publisher;
mod resolver;
mod settings;

pub use auth::{is_login_surface, AuthError, Credentials, Session, SessionAuthenticator};
pub use chromium::{BrowserOptions, ChromiumLauncher, ChromiumPage};
pub use diagnostics::DiagnosticsSink;
pub use driver::{BrowserLauncher, DriverError, PageDriver, Point, Rect};
pub use orchestrator::Orchestrator;
pub use persist::{backup_filename, ensure_output_dir, AtomicFileWriter, BackupStore, PersistError};
pub use publisher::PublishStateMachine;
pub use resolver::{ElementResolver, Handle, NotFound};
pub use settings::PublishSettings;
