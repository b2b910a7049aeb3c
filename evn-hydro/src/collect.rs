//! Walks an hour range, one fetch per hour, inside a single render session.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{Result, ScrapeError};
use crate::fetch::{FetchOutcome, SampleFetcher, TargetRequest};
use crate::hour_range::HourRange;
use crate::render::RenderClient;
use crate::report::{LogReporter, Reporter};
use crate::reservoir::Reservoir;
use crate::sample::SampleSet;

/// Pause after every request, to be polite to the portal.
pub const REQUEST_DELAY: Duration = Duration::from_secs(1);

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Samples(SampleSet),
    /// Not a single hour yielded a sample
    NoData,
}

impl Collection {
    pub fn samples(&self) -> Option<&SampleSet> {
        match self {
            Collection::Samples(samples) => Some(samples),
            Collection::NoData => None,
        }
    }

    pub fn len(&self) -> usize {
        self.samples().map_or(0, SampleSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RangeCollector<R = LogReporter> {
    fetcher: SampleFetcher,
    request_delay: Duration,
    reporter: R,
    cancel: Option<Arc<AtomicBool>>,
}

impl RangeCollector<LogReporter> {
    pub fn new(fetcher: SampleFetcher) -> RangeCollector<LogReporter> {
        RangeCollector {
            fetcher,
            request_delay: REQUEST_DELAY,
            reporter: LogReporter,
            cancel: None,
        }
    }
}

impl<R: Reporter> RangeCollector<R> {
    pub fn with_reporter<T: Reporter>(self, reporter: T) -> RangeCollector<T> {
        RangeCollector {
            fetcher: self.fetcher,
            request_delay: self.request_delay,
            reporter,
            cancel: self.cancel,
        }
    }

    pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = request_delay;
        self
    }

    /// Checked before every request; once set, the run stops and keeps
    /// what it has collected so far.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Collect samples for every hour of `range`.
    ///
    /// Opens `client` once and closes it once, whether the loop finishes or
    /// the session dies. Failures of single hours only leave a gap.
    pub async fn collect<C: RenderClient>(
        &self,
        client: &mut C,
        range: HourRange,
        reservoir: &Reservoir,
    ) -> Result<Collection> {
        self.reporter.started(reservoir, &range);
        if let Err(e) = client.open().await {
            client.close().await;
            return Err(ScrapeError::Session(e));
        }
        let run = self.run(client, range, reservoir).await;
        client.close().await;
        let (samples, attempts) = run?;
        self.reporter.finished(reservoir, samples.len(), attempts);
        if samples.is_empty() {
            Ok(Collection::NoData)
        } else {
            Ok(Collection::Samples(samples))
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    async fn run<C: RenderClient>(
        &self,
        client: &mut C,
        range: HourRange,
        reservoir: &Reservoir,
    ) -> Result<(SampleSet, usize)> {
        let mut samples = SampleSet::new();
        let mut attempts = 0usize;
        for timestamp in range {
            if self.is_cancelled() {
                self.reporter.cancelled(attempts);
                break;
            }
            let request = TargetRequest::new(timestamp, reservoir);
            self.reporter.attempt(&request);
            attempts += 1;
            let outcome = self.fetcher.fetch(client, &request).await?;
            self.reporter.outcome(&request, &outcome);
            if let FetchOutcome::Sample(sample) = outcome {
                samples.push(sample);
            }
            if !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }
        }
        Ok((samples, attempts))
    }
}
