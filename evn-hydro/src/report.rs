//! Progress reporting for collection runs.

use evn_utils::timestamps::format_request;
use log::{error, info, warn};

use crate::fetch::{FetchOutcome, TargetRequest};
use crate::hour_range::HourRange;
use crate::reservoir::Reservoir;

/// Receives progress events from a [`crate::collect::RangeCollector`].
pub trait Reporter {
    fn started(&self, reservoir: &Reservoir, range: &HourRange);

    fn attempt(&self, request: &TargetRequest<'_>);

    fn outcome(&self, request: &TargetRequest<'_>, outcome: &FetchOutcome);

    fn cancelled(&self, attempts: usize);

    fn finished(&self, reservoir: &Reservoir, collected: usize, attempts: usize);
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn started(&self, reservoir: &Reservoir, range: &HourRange) {
        info!(
            "Starting data collection for {} (hc={})",
            reservoir.name, reservoir.id
        );
        info!(
            "Date range: {} to {}, {} requests every {}h",
            format_request(&range.start()),
            format_request(&range.end()),
            range.steps(),
            range.step_hours()
        );
    }

    fn attempt(&self, request: &TargetRequest<'_>) {
        info!(
            "Fetching {} at {}",
            request.reservoir.name,
            request.requested_at()
        );
    }

    fn outcome(&self, request: &TargetRequest<'_>, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::Sample(sample) => info!(
                "Extracted data for {}: {}",
                request.reservoir.name, sample.observed_at
            ),
            FetchOutcome::Empty => warn!(
                "No data found for {} at {}",
                request.reservoir.name,
                request.requested_at()
            ),
            FetchOutcome::Failed(failure) => {
                error!("Error scraping {}: {}", request.requested_at(), failure)
            }
        }
    }

    fn cancelled(&self, attempts: usize) {
        warn!("Collection cancelled after {} requests", attempts);
    }

    fn finished(&self, reservoir: &Reservoir, collected: usize, attempts: usize) {
        if collected == 0 {
            warn!("No data collected for {} ({} requests)", reservoir.name, attempts);
        } else {
            info!(
                "Total records collected for {}: {} of {} requests",
                reservoir.name, collected, attempts
            );
        }
    }
}
