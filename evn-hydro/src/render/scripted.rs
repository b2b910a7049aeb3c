//! In-memory render session that serves canned pages, for tests.

use std::time::Duration;

use scraper::{Html, Selector};

use super::RenderClient;
use crate::error::RenderError;

pub(crate) enum Page {
    Html(String),
    NavigationError(String),
}

type Responder = Box<dyn FnMut(&str) -> Page>;

pub(crate) struct ScriptedClient {
    responder: Responder,
    open: bool,
    current: Option<String>,
    pub fail_open: bool,
    /// Session drops once this many navigations have succeeded.
    pub lose_session_after: Option<usize>,
    pub opens: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
}

impl ScriptedClient {
    pub fn new(responder: impl FnMut(&str) -> Page + 'static) -> ScriptedClient {
        ScriptedClient {
            responder: Box::new(responder),
            open: false,
            current: None,
            fail_open: false,
            lose_session_after: None,
            opens: 0,
            closes: 0,
            navigations: Vec::new(),
        }
    }

    /// Serve the same page for every URL.
    pub fn serving(html: String) -> ScriptedClient {
        ScriptedClient::new(move |_| Page::Html(html.clone()))
    }

    /// The `td` values of every navigation, in order.
    pub fn requested_times(&self) -> Vec<String> {
        self.navigations.iter().map(|url| td_param(url).to_string()).collect()
    }
}

/// The raw `td` query value of a portal URL.
pub(crate) fn td_param(url: &str) -> &str {
    url.split_once("td=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or_default())
        .unwrap_or_default()
}

/// Eleven cells in portal layout for `name`, observed at `time`.
pub(crate) fn data_row(name: &str, time: &str) -> Vec<String> {
    let mut cells = vec![format!("{}<br>{}", name, time), time.to_string()];
    cells.extend(
        ["104.52", "105", "31.2", "412.5", "398.1", "398.1", "0", "0", "0"]
            .iter()
            .map(|v| v.to_string()),
    );
    cells
}

/// A page holding the reservoir table with a header row and `rows`.
pub(crate) fn table_page(rows: &[Vec<String>]) -> String {
    let mut html = String::from(
        "<html><body><div id=\"grid\"><table class=\"tblgridtd\">\
         <tr><th>Tên hồ</th><th>Thời điểm</th><th>Htl</th></tr>",
    );
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            html.push_str(cell);
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></div></body></html>");
    html
}

impl RenderClient for ScriptedClient {
    async fn open(&mut self) -> Result<(), RenderError> {
        if self.fail_open {
            return Err(RenderError::Launch("no browser available".to_string()));
        }
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        if !self.open {
            return Err(RenderError::NotOpen);
        }
        if self.lose_session_after == Some(self.navigations.len()) {
            self.open = false;
            return Err(RenderError::NotOpen);
        }
        self.navigations.push(url.to_string());
        match (self.responder)(url) {
            Page::Html(html) => {
                self.current = Some(html);
                Ok(())
            }
            Page::NavigationError(reason) => {
                self.current = None;
                Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason,
                })
            }
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), RenderError> {
        if !self.open {
            return Err(RenderError::NotOpen);
        }
        let parsed = Selector::parse(selector)
            .map_err(|e| RenderError::Content(format!("invalid selector: {}", e)))?;
        let present = self
            .current
            .as_deref()
            .map(|html| Html::parse_document(html).select(&parsed).next().is_some())
            .unwrap_or(false);
        if present {
            Ok(())
        } else {
            Err(RenderError::Timeout {
                selector: selector.to_string(),
                after: timeout,
            })
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        if !self.open {
            return Err(RenderError::NotOpen);
        }
        self.current
            .clone()
            .ok_or_else(|| RenderError::Content("no page loaded".to_string()))
    }

    async fn close(&mut self) {
        self.open = false;
        self.current = None;
        self.closes += 1;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
