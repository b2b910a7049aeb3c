//! Render sessions: load a URL, wait for content, hand back the DOM as HTML.
//!
//! Two backends are available behind cargo features:
//! - `browser`: [`chrome::ChromeClient`], a headless Chrome session that runs
//!   the page's scripts before the DOM is read.
//! - `api`: [`http::HttpClient`], a plain HTTP fetch of the server-rendered
//!   page.

use std::time::Duration;

use crate::error::RenderError;

#[cfg(feature = "browser")]
pub mod chrome;
#[cfg(feature = "api")]
pub mod http;
#[cfg(test)]
pub(crate) mod scripted;

/// User agent presented to the portal.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Browser window size.
pub const VIEWPORT: (u32, u32) = (1920, 1080);

/// How long element lookups wait before giving up.
pub const IMPLICIT_WAIT: Duration = Duration::from_secs(10);

/// Upper bound on a single page load.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Session configuration shared by all backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub headless: bool,
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub implicit_wait: Duration,
    pub page_timeout: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            headless: true,
            viewport: VIEWPORT,
            user_agent: USER_AGENT.to_string(),
            implicit_wait: IMPLICIT_WAIT,
            page_timeout: PAGE_TIMEOUT,
        }
    }
}

impl RenderSettings {
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

/// A page rendering session.
///
/// A session is opened once per run, driven through any number of
/// navigations and closed once at the end. `close` must be safe to call on
/// a session that was never opened.
#[allow(async_fn_in_trait)]
pub trait RenderClient {
    /// Start the session.
    async fn open(&mut self) -> Result<(), RenderError>;

    /// Load `url`. Fails with [`RenderError::NotOpen`] outside a session.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait until an element matching the CSS `selector` is present.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError>;

    /// The current document as HTML.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Tear the session down. No-op when not open.
    async fn close(&mut self);

    fn is_open(&self) -> bool;
}
