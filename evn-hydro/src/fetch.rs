//! One request per hour: build the portal URL, load it, let it settle and
//! read the reservoir's row.

use std::time::Duration;

use chrono::NaiveDateTime;
use evn_utils::timestamps::format_request;
use log::debug;
use tokio::time::{sleep, Instant};

use crate::error::{FetchFailure, Result, ScrapeError};
use crate::extract::RowExtractor;
use crate::render::RenderClient;
use crate::reservoir::Reservoir;
use crate::sample::Sample;

/// Page holding the hourly reservoir table.
pub const BASE_URL: &str = "https://hochuathuydien.evn.com.vn/PageHoChuaThuyDienEmbedEVN.aspx";

/// Longest time spent letting a page settle before reading it.
pub const SETTLE_BUDGET: Duration = Duration::from_secs(3);

/// Interval between checks while polling a page.
pub const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Build the request URL. The timestamp goes in as is, slashes, space and
/// colon included.
pub fn build_url(base_url: &str, requested_at: &str, reservoir_id: &str) -> String {
    format!("{}?td={}&hc={}", base_url, requested_at, reservoir_id)
}

/// How to decide a freshly loaded page is ready to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Sleep for a fixed time.
    Fixed(Duration),
    /// Poll until the table names the reservoir, or until its row count
    /// holds still between two polls, for at most `budget`.
    Poll { interval: Duration, budget: Duration },
}

impl Default for Settle {
    fn default() -> Self {
        Settle::Poll {
            interval: SETTLE_POLL_INTERVAL,
            budget: SETTLE_BUDGET,
        }
    }
}

/// Input to a single fetch.
#[derive(Debug, Clone, Copy)]
pub struct TargetRequest<'a> {
    pub timestamp: NaiveDateTime,
    pub reservoir: &'a Reservoir,
}

impl<'a> TargetRequest<'a> {
    pub fn new(timestamp: NaiveDateTime, reservoir: &'a Reservoir) -> TargetRequest<'a> {
        TargetRequest {
            timestamp,
            reservoir,
        }
    }

    /// The timestamp as sent to the portal, "DD/MM/YYYY HH:MM".
    pub fn requested_at(&self) -> String {
        format_request(&self.timestamp)
    }

    pub fn url(&self, base_url: &str) -> String {
        build_url(base_url, &self.requested_at(), &self.reservoir.id)
    }
}

/// Result of one hour's fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The reservoir's row, stamped with the requested time
    Sample(Sample),
    /// The page had no row for the reservoir
    Empty,
    /// Navigation or extraction failed; the hour is skipped
    Failed(FetchFailure),
}

impl FetchOutcome {
    pub fn sample(&self) -> Option<&Sample> {
        match self {
            FetchOutcome::Sample(sample) => Some(sample),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleFetcher {
    base_url: String,
    settle: Settle,
    extractor: RowExtractor,
}

impl SampleFetcher {
    pub fn new(base_url: &str) -> Result<SampleFetcher> {
        Ok(SampleFetcher {
            base_url: base_url.trim_end_matches('?').to_string(),
            settle: Settle::default(),
            extractor: RowExtractor::new()?,
        })
    }

    pub fn with_settle(mut self, settle: Settle) -> SampleFetcher {
        self.settle = settle;
        self
    }

    pub fn with_extractor(mut self, extractor: RowExtractor) -> SampleFetcher {
        self.extractor = extractor;
        self
    }

    /// Fetch the sample for one request.
    ///
    /// Navigation and extraction problems come back as
    /// [`FetchOutcome::Failed`]. Only a lost session is an `Err`.
    pub async fn fetch<C: RenderClient>(
        &self,
        client: &mut C,
        request: &TargetRequest<'_>,
    ) -> Result<FetchOutcome> {
        let url = request.url(&self.base_url);
        debug!("Navigating to: {}", url);
        match self.load_and_extract(client, &url, &request.reservoir.name).await {
            Ok(Some(sample)) => Ok(FetchOutcome::Sample(
                sample.with_requested_at(request.requested_at()),
            )),
            Ok(None) => Ok(FetchOutcome::Empty),
            Err(FetchFailure::Render(e)) if e.is_fatal() => Err(ScrapeError::Session(e)),
            Err(failure) => Ok(FetchOutcome::Failed(failure)),
        }
    }

    async fn load_and_extract<C: RenderClient>(
        &self,
        client: &mut C,
        url: &str,
        name: &str,
    ) -> std::result::Result<Option<Sample>, FetchFailure> {
        client.navigate(url).await?;
        self.settle(client, name).await?;
        self.extractor.extract(client, name).await
    }

    async fn settle<C: RenderClient>(
        &self,
        client: &mut C,
        name: &str,
    ) -> std::result::Result<(), FetchFailure> {
        match self.settle {
            Settle::Fixed(delay) => {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                Ok(())
            }
            Settle::Poll { interval, budget } => {
                let deadline = Instant::now() + budget;
                let mut last_rows = None;
                loop {
                    let html = client.content().await?;
                    let state = self.extractor.table_state(&html, name);
                    if state.has_target || (state.rows > 0 && last_rows == Some(state.rows)) {
                        return Ok(());
                    }
                    last_rows = Some(state.rows);
                    if Instant::now() + interval > deadline {
                        // extraction still waits for the table itself
                        debug!("page did not settle within {:?}", budget);
                        return Ok(());
                    }
                    sleep(interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractError, RenderError};
    use crate::render::scripted::{data_row, table_page, Page, ScriptedClient};
    use chrono::NaiveDate;

    fn reservoir() -> Reservoir {
        Reservoir::new("27", "Test Reservoir")
    }

    fn fetcher() -> SampleFetcher {
        SampleFetcher::new(BASE_URL)
            .unwrap()
            .with_settle(Settle::Fixed(Duration::ZERO))
    }

    fn seven_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 4)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_build_url_keeps_timestamp_literal() {
        let reservoir = Reservoir::new("27", "Sông Ba Hạ");
        let request = TargetRequest::new(seven_am(), &reservoir);
        assert_eq!(request.requested_at(), "04/11/2025 07:00");
        assert_eq!(
            request.url(BASE_URL),
            "https://hochuathuydien.evn.com.vn/PageHoChuaThuyDienEmbedEVN.aspx?td=04/11/2025 07:00&hc=27"
        );
    }

    #[tokio::test]
    async fn test_fetch_attaches_requested_time() {
        // the page echoes a rounded time; the requested one is kept separately
        let page = table_page(&[data_row("Test Reservoir", "04/11/2025 06:59")]);
        let mut client = ScriptedClient::serving(page);
        client.open().await.unwrap();
        let reservoir = reservoir();
        let outcome = fetcher()
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        let sample = outcome.sample().unwrap();
        assert_eq!(sample.observed_at, "04/11/2025 06:59");
        assert_eq!(sample.requested_at, "04/11/2025 07:00");
        assert_eq!(client.requested_times(), vec!["04/11/2025 07:00"]);
        assert!(client.navigations[0].ends_with("&hc=27"));
    }

    #[tokio::test]
    async fn test_fetch_no_match_is_empty() {
        let mut client = ScriptedClient::serving(table_page(&[data_row("Other", "t")]));
        client.open().await.unwrap();
        let reservoir = reservoir();
        let outcome = fetcher()
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::Empty));
    }

    #[tokio::test]
    async fn test_fetch_short_row_fails_softly() {
        let mut row = data_row("Test Reservoir", "t");
        row.truncate(10);
        let mut client = ScriptedClient::serving(table_page(&[row]));
        client.open().await.unwrap();
        let reservoir = reservoir();
        let outcome = fetcher()
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchFailure::Extract(ExtractError::MalformedRow { cells: 10, .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_navigation_error_fails_softly() {
        let mut client = ScriptedClient::new(|_| Page::NavigationError("connection reset".to_string()));
        client.open().await.unwrap();
        let reservoir = reservoir();
        let outcome = fetcher()
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchFailure::Render(RenderError::Navigation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_without_session_is_fatal() {
        let mut client = ScriptedClient::serving(table_page(&[]));
        let reservoir = reservoir();
        let result = fetcher()
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await;
        assert!(matches!(result, Err(ScrapeError::Session(RenderError::NotOpen))));
    }

    #[tokio::test]
    async fn test_poll_settle_returns_once_target_present() {
        let page = table_page(&[data_row("Test Reservoir", "t")]);
        let mut client = ScriptedClient::serving(page);
        client.open().await.unwrap();
        let reservoir = reservoir();
        let fetcher = SampleFetcher::new(BASE_URL).unwrap().with_settle(Settle::Poll {
            interval: Duration::from_millis(1),
            budget: Duration::from_secs(60),
        });
        let started = std::time::Instant::now();
        let outcome = fetcher
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        assert!(outcome.sample().is_some());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_poll_settle_gives_up_on_empty_page() {
        let mut client = ScriptedClient::serving("<html><body></body></html>".to_string());
        client.open().await.unwrap();
        let reservoir = reservoir();
        let fetcher = SampleFetcher::new(BASE_URL).unwrap().with_settle(Settle::Poll {
            interval: Duration::from_millis(1),
            budget: Duration::from_millis(20),
        });
        let outcome = fetcher
            .fetch(&mut client, &TargetRequest::new(seven_am(), &reservoir))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            FetchOutcome::Failed(FetchFailure::Extract(ExtractError::TableNotFound(_)))
        ));
    }
}
