use serde::{Deserialize, Serialize};

pub const DEFAULT_SENTINEL: &str = "===ここから有料===";
pub const DEFAULT_FALLBACK_PHRASES: [&str; 2] = ["ここから有料", "有料エリア"];

/// Sentinel text separating the free part of a body from the paid part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishMarker {
    pub sentinel: String,
    /// Looser phrases tried on the page when the exact sentinel is not rendered.
    pub fallbacks: Vec<String>,
}

/// Line-based view of where the sentinel sits in a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerScan {
    /// Zero-based index of the first line carrying the sentinel.
    pub first_line: Option<usize>,
    pub occurrences: usize,
}

impl Default for PublishMarker {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            fallbacks: DEFAULT_FALLBACK_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl PublishMarker {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallbacks<I, S>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    /// Sentinel first, then the fallback phrases, skipping blanks.
    pub fn search_phrases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.sentinel.as_str())
            .chain(self.fallbacks.iter().map(String::as_str))
            .filter(|phrase| !phrase.trim().is_empty())
    }

    /// Scans line by line. Fenced code is not special here: a sentinel inside
    /// a fence still counts.
    pub fn scan(&self, body: &str) -> MarkerScan {
        let mut scan = MarkerScan {
            first_line: None,
            occurrences: 0,
        };
        if self.sentinel.is_empty() {
            return scan;
        }
        for (idx, line) in body.lines().enumerate() {
            if line.contains(self.sentinel.as_str()) {
                scan.occurrences += 1;
                if scan.first_line.is_none() {
                    scan.first_line = Some(idx);
                }
            }
        }
        scan
    }
}
