use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use super::{RenderClient, RenderSettings};
use crate::error::RenderError;

/// Fetches the server-rendered page over plain HTTP.
///
/// The portal builds its table on the server, so no script execution is
/// needed. `wait_for` checks the fetched document once; there is nothing
/// left to wait for after the body has arrived.
pub struct HttpClient {
    settings: RenderSettings,
    client: Option<Client>,
    page: Option<String>,
}

impl HttpClient {
    pub fn new(settings: RenderSettings) -> HttpClient {
        HttpClient {
            settings,
            client: None,
            page: None,
        }
    }
}

impl RenderClient for HttpClient {
    async fn open(&mut self) -> Result<(), RenderError> {
        if self.is_open() {
            return Ok(());
        }
        let client = Client::builder()
            .user_agent(self.settings.user_agent.as_str())
            .timeout(self.settings.page_timeout)
            .build()
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        self.client = Some(client);
        info!("HTTP session started");
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let client = self.client.as_ref().ok_or(RenderError::NotOpen)?;
        self.page = None;
        let failed = |reason: String| RenderError::Navigation {
            url: url.to_string(),
            reason,
        };
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(failed(format!("bad response status {}", response.status())));
        }
        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        debug!("fetched {} bytes from {}", body.len(), url);
        self.page = Some(body);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        let page = self
            .page
            .as_deref()
            .ok_or_else(|| RenderError::Content("no page loaded".to_string()))?;
        let parsed = Selector::parse(selector)
            .map_err(|e| RenderError::Content(format!("invalid selector '{}': {}", selector, e)))?;
        if Html::parse_document(page).select(&parsed).next().is_some() {
            Ok(())
        } else {
            Err(RenderError::Timeout {
                selector: selector.to_string(),
                after: timeout,
            })
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        if !self.is_open() {
            return Err(RenderError::NotOpen);
        }
        self.page
            .clone()
            .ok_or_else(|| RenderError::Content("no page loaded".to_string()))
    }

    async fn close(&mut self) {
        self.page = None;
        if self.client.take().is_some() {
            info!("HTTP session closed");
        }
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }
}
