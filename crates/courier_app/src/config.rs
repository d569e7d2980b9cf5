use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_core::{Intent, PublishMarker, ResolutionStrategy, StrategyBook};
use courier_engine::{BrowserOptions, Credentials, PublishSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "courier.ron";
pub const EMAIL_VAR: &str = "NOTE_EMAIL";
pub const PASSWORD_VAR: &str = "NOTE_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{0} is not set (environment or .env)")]
    MissingCredential(&'static str),
}

/// Everything the binary reads from `courier.ron`. Every field has a default,
/// so an empty `()` file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub browser: BrowserSection,
    pub publish: PublishSection,
    pub backup_dir: PathBuf,
    pub diagnostics_dir: PathBuf,
    pub ledger_path: PathBuf,
    /// Replaces the built-in strategy list of each intent named here.
    pub strategies: BTreeMap<Intent, Vec<ResolutionStrategy>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
    pub locale: String,
    pub chrome_executable: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    pub login_url: String,
    pub editor_url: String,
    pub element_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub typing_delay_ms: u64,
    pub tag_pacing_ms: u64,
    pub overlay_timeout_ms: u64,
    pub submit_settle_ms: u64,
    pub capture_timeout_ms: u64,
    pub marker_scroll_attempts: usize,
    pub marker_scroll_step: f64,
    pub minimum_price_value: u32,
    pub marker: PublishMarker,
    pub default_price: u32,
    pub interval_secs: u64,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            browser: BrowserSection::default(),
            publish: PublishSection::default(),
            backup_dir: PathBuf::from("output"),
            diagnostics_dir: PathBuf::from("output").join("diagnostics"),
            ledger_path: PathBuf::from("output").join("posted.ron"),
            strategies: BTreeMap::new(),
        }
    }
}

impl Default for BrowserSection {
    fn default() -> Self {
        let options = BrowserOptions::default();
        Self {
            headless: options.headless,
            window_width: options.window_width,
            window_height: options.window_height,
            user_agent: options.user_agent,
            locale: options.locale,
            chrome_executable: options.chrome_executable,
        }
    }
}

impl Default for PublishSection {
    fn default() -> Self {
        let settings = PublishSettings::default();
        let ms = |d: Duration| d.as_millis() as u64;
        Self {
            element_timeout_ms: ms(settings.element_timeout),
            navigation_timeout_ms: ms(settings.navigation_timeout),
            poll_interval_ms: ms(settings.poll_interval),
            settle_delay_ms: ms(settings.settle_delay),
            typing_delay_ms: ms(settings.typing_delay),
            tag_pacing_ms: ms(settings.tag_pacing),
            overlay_timeout_ms: ms(settings.overlay_timeout),
            submit_settle_ms: ms(settings.submit_settle),
            capture_timeout_ms: ms(settings.capture_timeout),
            marker_scroll_attempts: settings.marker_scroll_attempts,
            marker_scroll_step: settings.marker_scroll_step,
            minimum_price_value: settings.minimum_price_value,
            login_url: settings.login_url,
            editor_url: settings.editor_url,
            marker: settings.marker,
            default_price: 300,
            interval_secs: 10,
        }
    }
}

impl CourierConfig {
    /// Reads `path`, or `./courier.ron` when no path is given. A missing
    /// default file means built-in defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path),
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn publish_settings(&self) -> PublishSettings {
        let p = &self.publish;
        PublishSettings {
            login_url: p.login_url.clone(),
            editor_url: p.editor_url.clone(),
            element_timeout: Duration::from_millis(p.element_timeout_ms),
            navigation_timeout: Duration::from_millis(p.navigation_timeout_ms),
            poll_interval: Duration::from_millis(p.poll_interval_ms),
            settle_delay: Duration::from_millis(p.settle_delay_ms),
            typing_delay: Duration::from_millis(p.typing_delay_ms),
            tag_pacing: Duration::from_millis(p.tag_pacing_ms),
            overlay_timeout: Duration::from_millis(p.overlay_timeout_ms),
            submit_settle: Duration::from_millis(p.submit_settle_ms),
            capture_timeout: Duration::from_millis(p.capture_timeout_ms),
            marker_scroll_attempts: p.marker_scroll_attempts,
            marker_scroll_step: p.marker_scroll_step,
            minimum_price_value: p.minimum_price_value,
            marker: p.marker.clone(),
        }
    }

    pub fn browser_options(&self, force_headless: bool) -> BrowserOptions {
        let b = &self.browser;
        BrowserOptions {
            headless: b.headless || force_headless,
            window_width: b.window_width,
            window_height: b.window_height,
            user_agent: b.user_agent.clone(),
            locale: b.locale.clone(),
            chrome_executable: b.chrome_executable.clone(),
        }
    }

    pub fn strategy_book(&self) -> StrategyBook {
        StrategyBook::note_defaults().with_overrides(self.strategies.clone())
    }
}

/// Reads `NOTE_EMAIL` / `NOTE_PASSWORD`, after loading `.env` if present.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    let _ = dotenvy::dotenv();
    let read = |name: &'static str| {
        env::var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(name))
    };
    Ok(Credentials::new(read(EMAIL_VAR)?, read(PASSWORD_VAR)?))
}
