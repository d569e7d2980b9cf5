//! Record of articles already published, so a rerun does not post twice.

use std::fs;
use std::path::{Path, PathBuf};

use courier_engine::{AtomicFileWriter, PersistError};
use courier_logging::{courier_info, courier_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger path {0:?} has no file name")]
    BadPath(PathBuf),
    #[error("cannot serialize ledger: {0}")]
    Serialize(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Source file the article was read from.
    pub source: String,
    pub title: String,
    pub published_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct LedgerFile {
    published: Vec<LedgerEntry>,
}

#[derive(Debug)]
pub struct PublishedLedger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl PublishedLedger {
    /// Unreadable or malformed ledgers are logged and treated as empty.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(text) => match ron::from_str::<LedgerFile>(&text) {
                Ok(file) => {
                    courier_info!("loaded {} ledger entries from {:?}", file.published.len(), path);
                    file.published
                }
                Err(err) => {
                    courier_warn!("ignoring malformed ledger {:?}: {}", path, err);
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                courier_warn!("cannot read ledger {:?}: {}", path, err);
                Vec::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.iter().any(|entry| entry.source == source)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Adds an entry and writes the ledger straight away.
    pub fn record(&mut self, source: &str, title: &str) -> Result<(), LedgerError> {
        self.entries.retain(|entry| entry.source != source);
        self.entries.push(LedgerEntry {
            source: source.to_string(),
            title: title.to_string(),
            published_at: chrono::Local::now().to_rfc3339(),
        });
        self.save()
    }

    pub fn save(&self) -> Result<(), LedgerError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LedgerError::BadPath(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let file = LedgerFile {
            published: self.entries.clone(),
        };
        let content = ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::new())
            .map_err(|err| LedgerError::Serialize(err.to_string()))?;
        AtomicFileWriter::new(dir).write(file_name, &content)?;
        Ok(())
    }
}
