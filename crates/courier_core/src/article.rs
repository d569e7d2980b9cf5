use std::path::{Path, PathBuf};

/// An article ready to be pushed through the editor. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    title: String,
    body: String,
    tags: Vec<String>,
    price: u32,
    image: Option<PathBuf>,
}

impl Article {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            price: 0,
            image: None,
        }
    }

    /// Tags are submitted in the order given; blank entries are dropped.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags
            .into_iter()
            .map(Into::into)
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        self
    }

    pub fn with_price(mut self, price: u32) -> Self {
        self.price = price;
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn is_priced(&self) -> bool {
        self.price > 0
    }
}
