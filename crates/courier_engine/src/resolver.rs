use std::time::Duration;

use courier_core::{Intent, ResolutionStrategy, StrategyBook, StrategyKind};
use courier_logging::{courier_debug, courier_trace};
use thiserror::Error;
use tokio::time::Instant;

use crate::{DriverError, PageDriver, Point, Rect};

/// A resolved control: a real element, or a coordinate when only an in-page
/// script could see it.
#[derive(Debug)]
pub enum Handle<E> {
    Element(E),
    Point(Point),
}

impl<E> Handle<E> {
    pub fn element(&self) -> Option<&E> {
        match self {
            Handle::Element(element) => Some(element),
            Handle::Point(_) => None,
        }
    }

    pub fn into_element(self) -> Option<E> {
        match self {
            Handle::Element(element) => Some(element),
            Handle::Point(_) => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{intent} not found (tried {attempted:?})")]
pub struct NotFound {
    pub intent: Intent,
    pub attempted: Vec<StrategyKind>,
}

/// Turns intents into handles by walking the configured strategies in order.
/// Never changes the page.
#[derive(Debug, Clone)]
pub struct ElementResolver {
    book: StrategyBook,
}

impl ElementResolver {
    pub fn new(book: StrategyBook) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &StrategyBook {
        &self.book
    }

    pub async fn resolve<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
    ) -> Result<Handle<P::Element>, NotFound> {
        let handles = self.resolve_all(page, intent).await?;
        handles.into_iter().next().ok_or(NotFound {
            intent,
            attempted: Vec::new(),
        })
    }

    /// Every usable match of the first strategy that yields any, in the
    /// order that strategy ranks them.
    pub async fn resolve_all<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
    ) -> Result<Vec<Handle<P::Element>>, NotFound> {
        let mut attempted = Vec::new();
        for strategy in self.book.get(intent) {
            attempted.push(strategy.kind());
            let found = match strategy {
                ResolutionStrategy::SpatialProximity {
                    anchor,
                    candidates,
                    max_offset,
                } => self.evaluate_spatial(page, *anchor, candidates, *max_offset).await,
                other => evaluate_direct(page, other).await,
            };
            match found {
                Ok(handles) if !handles.is_empty() => {
                    courier_trace!("{intent}: {:?} matched {}", strategy.kind(), handles.len());
                    return Ok(handles);
                }
                Ok(_) => {}
                Err(err) => courier_debug!("{intent}: {:?} failed: {err}", strategy.kind()),
            }
        }
        Err(NotFound { intent, attempted })
    }

    /// Polls [`Self::resolve`] until it succeeds or `timeout` elapses.
    pub async fn resolve_within<P: PageDriver>(
        &self,
        page: &P,
        intent: Intent,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Handle<P::Element>, NotFound> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.resolve(page, intent).await {
                Ok(handle) => return Ok(handle),
                Err(not_found) if Instant::now() >= deadline => return Err(not_found),
                Err(_) => tokio::time::sleep(poll).await,
            }
        }
    }

    async fn evaluate_spatial<P: PageDriver>(
        &self,
        page: &P,
        anchor: Intent,
        candidates: &str,
        max_offset: f64,
    ) -> Result<Vec<Handle<P::Element>>, DriverError> {
        // The anchor is looked up without spatial strategies of its own.
        let mut anchor_top = None;
        for strategy in self.book.get(anchor) {
            if strategy.kind() == StrategyKind::SpatialProximity {
                continue;
            }
            let handles = evaluate_direct(page, strategy).await?;
            if let Some(handle) = handles.first() {
                anchor_top = handle_top(page, handle).await;
                break;
            }
        }
        let Some(anchor_top) = anchor_top else {
            return Ok(Vec::new());
        };

        let mut near = Vec::new();
        for element in page.query_css(candidates).await? {
            if let Some(rect) = usable_rect(page, &element).await? {
                let offset = (rect.y - anchor_top).abs();
                if offset < max_offset {
                    near.push((offset, element));
                }
            }
        }
        near.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(near
            .into_iter()
            .map(|(_, element)| Handle::Element(element))
            .collect())
    }
}

/// Vertical position of a handle in viewport pixels: the top edge of an
/// element, the y of a bare point.
pub(crate) async fn handle_top<P: PageDriver>(page: &P, handle: &Handle<P::Element>) -> Option<f64> {
    match handle {
        Handle::Element(element) => page
            .bounding_box(element)
            .await
            .ok()
            .flatten()
            .map(|rect| rect.y),
        Handle::Point(point) => Some(point.y),
    }
}

pub(crate) async fn click_handle<P: PageDriver>(
    page: &P,
    handle: &Handle<P::Element>,
) -> Result<(), DriverError> {
    match handle {
        Handle::Element(element) => page.click(element).await,
        Handle::Point(point) => page.click_at(*point).await,
    }
}

async fn evaluate_direct<P: PageDriver>(
    page: &P,
    strategy: &ResolutionStrategy,
) -> Result<Vec<Handle<P::Element>>, DriverError> {
    match strategy {
        ResolutionStrategy::AttributeMatch { selector } => {
            let found = page.query_css(selector).await?;
            visible(page, found).await
        }
        ResolutionStrategy::TextMatch { tag, text, exact } => {
            let found = page.query_text(tag, text, *exact).await?;
            visible(page, found).await
        }
        ResolutionStrategy::StructuralFallback { selector, index } => {
            let found = page.query_css(selector).await?;
            let mut usable = visible(page, found).await?;
            if *index < usable.len() {
                Ok(vec![usable.swap_remove(*index)])
            } else {
                Ok(Vec::new())
            }
        }
        ResolutionStrategy::ScriptQuery { text } => Ok(page
            .script_query(text)
            .await?
            .into_iter()
            .map(Handle::Point)
            .collect()),
        ResolutionStrategy::SpatialProximity { .. } => Ok(Vec::new()),
    }
}

async fn visible<P: PageDriver>(
    page: &P,
    elements: Vec<P::Element>,
) -> Result<Vec<Handle<P::Element>>, DriverError> {
    let mut usable = Vec::with_capacity(elements.len());
    for element in elements {
        if usable_rect(page, &element).await?.is_some() {
            usable.push(Handle::Element(element));
        }
    }
    Ok(usable)
}

async fn usable_rect<P: PageDriver>(
    page: &P,
    element: &P::Element,
) -> Result<Option<Rect>, DriverError> {
    if !page.is_interactable(element).await? {
        return Ok(None);
    }
    Ok(page
        .bounding_box(element)
        .await?
        .filter(Rect::is_rendered))
}
