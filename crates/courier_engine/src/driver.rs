use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Axis-aligned box in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("browser did not answer within {0:?}")]
    Timeout(Duration),
    #[error("browser error: {0}")]
    Browser(String),
}

/// Everything the publisher needs from a live page. Element handles are
/// opaque and only meaningful to the driver that produced them.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Send + Sync;

    async fn goto(&self, url: &str) -> Result<(), DriverError>;
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Elements matching a CSS selector, in document order.
    async fn query_css(&self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;
    /// Elements of `tag` (`*` for any) whose visible text equals or contains `text`.
    async fn query_text(
        &self,
        tag: &str,
        text: &str,
        exact: bool,
    ) -> Result<Vec<Self::Element>, DriverError>;
    /// Centers of buttons with exactly this text, searched through shadow roots too.
    async fn script_query(&self, text: &str) -> Result<Vec<Point>, DriverError>;
    /// Box of the innermost visible text matching `text`, if on screen.
    async fn locate_text(&self, text: &str, exact: bool) -> Result<Option<Rect>, DriverError>;

    async fn bounding_box(&self, element: &Self::Element) -> Result<Option<Rect>, DriverError>;
    async fn is_interactable(&self, element: &Self::Element) -> Result<bool, DriverError>;
    async fn input_value(&self, element: &Self::Element) -> Result<Option<String>, DriverError>;

    async fn click(&self, element: &Self::Element) -> Result<(), DriverError>;
    async fn click_at(&self, point: Point) -> Result<(), DriverError>;
    async fn clear(&self, element: &Self::Element) -> Result<(), DriverError>;
    /// Types into the element one character at a time, `\n` as Enter.
    async fn type_text(
        &self,
        element: &Self::Element,
        text: &str,
        per_char_delay: Duration,
    ) -> Result<(), DriverError>;
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
    /// Hands a file to the most recent file input of the page.
    async fn attach_file(&self, path: &Path) -> Result<(), DriverError>;

    async fn scroll_by(&self, dy: f64) -> Result<(), DriverError>;
    async fn scroll_to_top(&self) -> Result<(), DriverError>;
    async fn screenshot(&self, path: &Path) -> Result<(), DriverError>;
}

/// Starts one isolated browser page per publish attempt.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Page: PageDriver;

    async fn launch(&self) -> Result<Self::Page, DriverError>;
    async fn close(&self, page: Self::Page) -> Result<(), DriverError>;
}
