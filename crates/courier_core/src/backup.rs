use thiserror::Error;

use crate::Article;

const TITLE_PREFIX: &str = "# ";
const TAGS_PREFIX: &str = "**Tags:**";
const SEPARATOR: &str = "---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackupError {
    #[error("backup has no `# title` line before the separator")]
    MissingTitle,
    #[error("backup has no `---` separator after its header")]
    MissingSeparator,
}

/// Header fields and body recovered from a backup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupDocument {
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
}

impl BackupDocument {
    pub fn into_article(self, price: u32) -> Article {
        Article::new(self.title, self.body)
            .with_tags(self.tags)
            .with_price(price)
    }
}

/// Renders the article as it is kept on disk: title heading, tag line (only
/// when there are tags), separator, then the unsanitized body.
pub fn render_backup(article: &Article) -> String {
    let mut out = format!("{TITLE_PREFIX}{}\n\n", article.title());
    if !article.tags().is_empty() {
        out.push_str(&format!("{TAGS_PREFIX} {}\n\n", article.tags().join(", ")));
    }
    out.push_str(SEPARATOR);
    out.push_str("\n\n");
    out.push_str(article.body());
    out
}

/// Reads a document written by [`render_backup`]. Only the header is
/// interpreted; the body after the first separator is taken as is, minus
/// surrounding blank lines.
pub fn parse_backup(text: &str) -> Result<BackupDocument, BackupError> {
    let mut title: Option<String> = None;
    let mut tags = Vec::new();
    let mut body_start = None;

    let lines: Vec<&str> = text.lines().collect();
    for (index, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
            if title.is_none() {
                title = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix(TAGS_PREFIX) {
            tags = rest
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect();
        } else if line.starts_with(SEPARATOR) {
            body_start = Some(index + 1);
            break;
        }
    }

    let body_start = body_start.ok_or(BackupError::MissingSeparator)?;
    let title = title
        .filter(|t| !t.is_empty())
        .ok_or(BackupError::MissingTitle)?;
    let body = lines[body_start..].join("\n").trim_matches('\n').to_string();

    Ok(BackupDocument { title, tags, body })
}
