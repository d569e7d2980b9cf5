use std::time::Duration;

use courier_core::PublishMarker;

/// Timing budgets and page addresses used while publishing.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub login_url: String,
    pub editor_url: String,
    /// Wait-for-visible budget of a single control.
    pub element_timeout: Duration,
    /// Budget for leaving the login surface after submitting credentials.
    pub navigation_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause after clicks that swap the visible surface.
    pub settle_delay: Duration,
    pub typing_delay: Duration,
    pub tag_pacing: Duration,
    /// How long the crop/confirm overlay may take to appear after upload.
    pub overlay_timeout: Duration,
    pub submit_settle: Duration,
    pub capture_timeout: Duration,
    pub marker_scroll_attempts: usize,
    pub marker_scroll_step: f64,
    pub minimum_price_value: u32,
    pub marker: PublishMarker,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            login_url: "https://note.com/login".to_string(),
            editor_url: "https://note.com/notes/new".to_string(),
            element_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_secs(1),
            typing_delay: Duration::from_millis(2),
            tag_pacing: Duration::from_millis(500),
            overlay_timeout: Duration::from_secs(10),
            submit_settle: Duration::from_secs(3),
            capture_timeout: Duration::from_secs(5),
            marker_scroll_attempts: 5,
            marker_scroll_step: 300.0,
            minimum_price_value: 100,
            marker: PublishMarker::default(),
        }
    }
}
