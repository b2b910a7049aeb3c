use std::{ffi::OsStr, sync::Arc, time::Duration};

use headless_chrome::{Browser, LaunchOptions, Tab};
use log::{debug, info};

use super::{RenderClient, RenderSettings};
use crate::error::RenderError;

/// Chrome exits on its own when left idle longer than this.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

/// Headless Chrome session with a single tab.
///
/// headless_chrome blocks, so every call runs on tokio's blocking pool.
pub struct ChromeClient {
    settings: RenderSettings,
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

async fn blocking<T, F>(op: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

fn user_agent_arg(settings: &RenderSettings) -> String {
    format!("--user-agent={}", settings.user_agent)
}

fn launch_options<'a>(settings: &RenderSettings, user_agent: &'a str) -> anyhow::Result<LaunchOptions<'a>> {
    LaunchOptions::default_builder()
        .headless(settings.headless)
        .sandbox(false)
        .window_size(Some(settings.viewport))
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .args(vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
            OsStr::new(user_agent),
        ])
        .build()
        .map_err(|e| anyhow::anyhow!("invalid launch options: {}", e))
}

/// The tab's default timeout also bounds `wait_until_navigated`, so it is
/// the page load limit. Element waits pass their own timeout.
fn tab_timeout(settings: &RenderSettings) -> Duration {
    settings.page_timeout
}

impl ChromeClient {
    pub fn new(settings: RenderSettings) -> ChromeClient {
        ChromeClient {
            settings,
            browser: None,
            tab: None,
        }
    }

    fn tab(&self) -> Result<Arc<Tab>, RenderError> {
        self.tab.clone().ok_or(RenderError::NotOpen)
    }
}

impl RenderClient for ChromeClient {
    async fn open(&mut self) -> Result<(), RenderError> {
        if self.is_open() {
            return Ok(());
        }
        let settings = self.settings.clone();
        let (browser, tab) = blocking(move || {
            let user_agent = user_agent_arg(&settings);
            let browser = Browser::new(launch_options(&settings, &user_agent)?)?;
            let tab = browser.new_tab()?;
            tab.set_default_timeout(tab_timeout(&settings));
            tab.set_user_agent(&settings.user_agent, None, None)?;
            Ok((browser, tab))
        })
        .await
        .map_err(|e| RenderError::Launch(e.to_string()))?;
        self.browser = Some(browser);
        self.tab = Some(tab);
        info!(
            "Chrome session started (headless: {})",
            self.settings.headless
        );
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let tab = self.tab()?;
        let target = url.to_string();
        blocking(move || {
            tab.navigate_to(&target)?.wait_until_navigated()?;
            Ok(())
        })
        .await
        .map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        let tab = self.tab()?;
        let target = selector.to_string();
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&target, timeout)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            debug!("wait for '{}' failed: {}", selector, e);
            RenderError::Timeout {
                selector: selector.to_string(),
                after: timeout,
            }
        })
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        let tab = self.tab()?;
        blocking(move || Ok(tab.get_content()?))
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }

    async fn close(&mut self) {
        let tab = self.tab.take();
        let browser = self.browser.take();
        if browser.is_none() {
            return;
        }
        // dropping the Browser kills the Chrome process
        let closed = blocking(move || {
            if let Some(tab) = tab {
                tab.close(true)?;
            }
            drop(browser);
            Ok(())
        })
        .await;
        if let Err(e) = closed {
            debug!("tab close reported: {}", e);
        }
        info!("Chrome session closed");
    }

    fn is_open(&self) -> bool {
        self.tab.is_some()
    }
}
