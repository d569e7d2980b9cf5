//! Interfaces of the services that feed the publisher. Only their shape
//! matters here; implementations live with the callers.
use std::path::PathBuf;

use thiserror::Error;

use crate::Article;

#[derive(Debug, Error)]
#[error("{service}: {message}")]
pub struct CollaboratorError {
    pub service: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub image_prompt: Option<String>,
}

pub trait ContentGenerator {
    fn generate(&self, topic: &str) -> Result<GeneratedArticle, CollaboratorError>;
}

pub trait ImageGenerator {
    fn generate(&self, prompt: &str) -> Result<PathBuf, CollaboratorError>;
}

/// Turns a topic into a publishable article. A failing image service costs
/// the cover image only; a failing content service fails the whole call.
pub fn prepare_article(
    content: &dyn ContentGenerator,
    images: Option<&dyn ImageGenerator>,
    topic: &str,
    price: u32,
) -> Result<Article, CollaboratorError> {
    let generated = content.generate(topic)?;
    let mut article = Article::new(generated.title, generated.body)
        .with_tags(generated.tags)
        .with_price(price);

    if let (Some(images), Some(prompt)) = (images, generated.image_prompt.as_deref()) {
        if let Ok(path) = images.generate(prompt) {
            article = article.with_image(path);
        }
    }

    Ok(article)
}
