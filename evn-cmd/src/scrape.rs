//! Hourly collection for one reservoir, followed by CSV/XLSX export.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::anyhow;
use clap::{Args, ValueEnum};
use evn_hydro::collect::{Collection, RangeCollector};
use evn_hydro::extract::RowExtractor;
use evn_hydro::fetch::{SampleFetcher, Settle, BASE_URL, SETTLE_BUDGET};
use evn_hydro::hour_range::HourRange;
use evn_hydro::render::chrome::ChromeClient;
use evn_hydro::render::http::HttpClient;
use evn_hydro::render::{RenderClient, RenderSettings};
use evn_hydro::reservoir::Reservoir;
use evn_hydro::sample::{Sample, SampleSet};
use evn_utils::timestamps::{format_request, parse_timestamp};
use log::{error, info, warn};

/// Records shown at each end of the run summary.
const PREVIEW_RECORDS: usize = 5;

/// How pages are loaded.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Headless Chrome; runs the page's scripts
    Chrome,
    /// Plain HTTP GET of the server-rendered page
    Http,
}

/// How a loaded page is judged ready.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleMode {
    /// Poll the table until it names the reservoir or stops changing
    Poll,
    /// Always wait the full settle time
    Fixed,
}

#[derive(Args, Debug, Clone)]
pub struct ScrapeArgs {
    /// Reservoir to collect: catalogue slug, portal id or name
    #[arg(short = 'r', long, default_value = "song-ba-ha")]
    pub reservoir: String,

    /// Portal id of a reservoir missing from the catalogue (use with --name)
    #[arg(long, requires = "name")]
    pub id: Option<String>,

    /// Table name of a reservoir missing from the catalogue (use with --id)
    #[arg(long, requires = "id")]
    pub name: Option<String>,

    /// First hour to request, "DD/MM/YYYY HH:MM" or "YYYY-MM-DD [HH:MM]"
    #[arg(short, long)]
    pub start: Option<String>,

    /// Last hour to request; a bare date means 23:00 of that day
    #[arg(short, long)]
    pub end: Option<String>,

    /// CSV output path [default: <reservoir>_water_level.csv]
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// XLSX output path [default: <reservoir>_water_level.xlsx]
    #[arg(long)]
    pub xlsx: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    #[arg(long, value_enum, default_value_t = Backend::Chrome)]
    pub backend: Backend,

    /// Hours between requests
    #[arg(long, default_value_t = 1)]
    pub step_hours: u32,

    #[arg(long, value_enum, default_value_t = SettleMode::Poll)]
    pub settle: SettleMode,

    /// Pause after every request, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub request_delay_ms: u64,

    /// Portal page to query
    #[arg(long, default_value = BASE_URL)]
    pub base_url: String,
}

/// The reservoir named by `--id`/`--name`, or else the catalogue entry
/// matching `--reservoir`.
pub fn resolve_reservoir(args: &ScrapeArgs) -> anyhow::Result<Reservoir> {
    match (&args.id, &args.name) {
        (Some(id), Some(name)) => Ok(Reservoir::new(id, name)),
        _ => Ok(Reservoir::find(&args.reservoir)?),
    }
}

/// Hours to request. Missing bounds fall back to the reservoir's defaults.
pub fn resolve_range(args: &ScrapeArgs, reservoir: &Reservoir) -> anyhow::Result<HourRange> {
    let start = match &args.start {
        Some(s) => parse_timestamp(s, false)?,
        None => reservoir
            .default_start
            .ok_or_else(|| anyhow!("--start is required for {}", reservoir.name))?,
    };
    let end = match &args.end {
        Some(s) => parse_timestamp(s, true)?,
        None => reservoir
            .default_end
            .ok_or_else(|| anyhow!("--end is required for {}", reservoir.name))?,
    };
    Ok(HourRange::with_step(start, end, args.step_hours)?)
}

/// CSV and XLSX paths, defaulting to the reservoir's output stem.
pub fn output_paths(args: &ScrapeArgs, reservoir: &Reservoir) -> (PathBuf, PathBuf) {
    let stem = reservoir.output_stem();
    let csv = args
        .csv
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.csv", stem)));
    let xlsx = args
        .xlsx
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.xlsx", stem)));
    (csv, xlsx)
}

fn settle(mode: SettleMode) -> Settle {
    match mode {
        SettleMode::Poll => Settle::default(),
        SettleMode::Fixed => Settle::Fixed(SETTLE_BUDGET),
    }
}

/// First and last records of a run, without overlap.
pub fn preview(samples: &[Sample], n: usize) -> (&[Sample], &[Sample]) {
    let head = &samples[..samples.len().min(n)];
    let tail_start = samples.len().saturating_sub(n).max(head.len());
    (head, &samples[tail_start..])
}

/// The first interrupt sets `cancel` so the run stops between hours and
/// still exports. A second one calls `force_quit`.
async fn watch_interrupts<S, F>(mut interrupted: S, cancel: Arc<AtomicBool>, force_quit: impl FnOnce())
where
    S: FnMut() -> F,
    F: Future<Output = bool>,
{
    if !interrupted().await {
        return;
    }
    warn!("Interrupted, stopping after the current request (Ctrl-C again to quit now)");
    cancel.store(true, Ordering::SeqCst);
    if interrupted().await {
        error!("Interrupted again, quitting without export");
        force_quit();
    }
}

async fn collect_with<C: RenderClient>(
    collector: &RangeCollector,
    mut client: C,
    range: HourRange,
    reservoir: &Reservoir,
) -> anyhow::Result<Collection> {
    Ok(collector.collect(&mut client, range, reservoir).await?)
}

fn log_summary(reservoir: &Reservoir, range: &HourRange, samples: &SampleSet, written: &[PathBuf]) {
    info!("{}", "=".repeat(60));
    info!("Reservoir: {} (hc={})", reservoir.name, reservoir.id);
    info!(
        "Date range: {} to {}",
        format_request(&range.start()),
        format_request(&range.end())
    );
    info!("Records collected: {}", samples.len());
    for path in written {
        info!("Saved: {}", path.display());
    }
    let (head, tail) = preview(samples.as_slice(), PREVIEW_RECORDS);
    info!("First records:");
    for sample in head {
        info!("  {}", sample);
    }
    if !tail.is_empty() {
        info!("Last records:");
        for sample in tail {
            info!("  {}", sample);
        }
    }
    info!("{}", "=".repeat(60));
}

/// Collect the requested hours and export whatever was found.
pub async fn run_scrape(args: &ScrapeArgs) -> anyhow::Result<()> {
    let reservoir = resolve_reservoir(args)?;
    let range = resolve_range(args, &reservoir)?;
    let (csv_path, xlsx_path) = output_paths(args, &reservoir);

    let cancel = Arc::new(AtomicBool::new(false));
    let interrupt = tokio::spawn(watch_interrupts(
        || async { tokio::signal::ctrl_c().await.is_ok() },
        Arc::clone(&cancel),
        || {
            std::process::exit(130);
        },
    ));

    let settings = RenderSettings::default().headless(!args.headed);
    let extractor = RowExtractor::new()?.with_table_wait(settings.implicit_wait);
    let fetcher = SampleFetcher::new(&args.base_url)?
        .with_settle(settle(args.settle))
        .with_extractor(extractor);
    let collector = RangeCollector::new(fetcher)
        .with_request_delay(Duration::from_millis(args.request_delay_ms))
        .with_cancel_flag(cancel);

    let collection = match args.backend {
        Backend::Chrome => {
            collect_with(&collector, ChromeClient::new(settings), range, &reservoir).await
        }
        Backend::Http => {
            if args.headed {
                warn!("--headed has no effect with the http backend");
            }
            collect_with(&collector, HttpClient::new(settings), range, &reservoir).await
        }
    };
    interrupt.abort();

    match collection? {
        Collection::NoData => {
            error!("No data was collected for {}, nothing written", reservoir.name);
            Ok(())
        }
        Collection::Samples(samples) => {
            let written = evn_export::export(&samples, Some(csv_path.as_path()), Some(xlsx_path.as_path()))?;
            log_summary(&reservoir, &range, &samples, &written);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;
    use chrono::NaiveDate;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Command,
    }

    fn parse(args: &[&str]) -> ScrapeArgs {
        let mut argv = vec!["evn-cli", "scrape"];
        argv.extend_from_slice(args);
        match TestCli::try_parse_from(argv).unwrap().command {
            Command::Scrape(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn sample(requested_at: &str) -> Sample {
        let cells = ["Bản Vẽ", requested_at, "1", "2", "3", "4", "5", "6", "7", "8", "9"];
        Sample::from_cells(&cells).unwrap().with_requested_at(requested_at)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.reservoir, "song-ba-ha");
        assert_eq!(args.backend, Backend::Chrome);
        assert_eq!(args.settle, SettleMode::Poll);
        assert_eq!(args.step_hours, 1);
        assert_eq!(args.request_delay_ms, 1000);
        assert_eq!(args.base_url, BASE_URL);
        assert!(!args.headed);
    }

    #[test]
    fn test_id_requires_name() {
        let result = TestCli::try_parse_from(["evn-cli", "scrape", "--id", "31"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_range_and_outputs_from_catalogue() {
        let args = parse(&["--reservoir", "ban-ve"]);
        let reservoir = resolve_reservoir(&args).unwrap();
        assert_eq!(reservoir.id, "26");
        let range = resolve_range(&args, &reservoir).unwrap();
        assert_eq!(
            range.start(),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(range.steps(), 17 * 24);
        let (csv, xlsx) = output_paths(&args, &reservoir);
        assert_eq!(csv, PathBuf::from("ban_ve_water_level.csv"));
        assert_eq!(xlsx, PathBuf::from("ban_ve_water_level.xlsx"));
    }

    #[test]
    fn test_explicit_bounds_and_date_only_end() {
        let args = parse(&[
            "-r", "27", "--start", "2025-11-04 06:00", "--end", "2025-11-04", "--backend", "http",
            "--csv", "out.csv",
        ]);
        let reservoir = resolve_reservoir(&args).unwrap();
        let range = resolve_range(&args, &reservoir).unwrap();
        assert_eq!(range.steps(), 18);
        assert_eq!(format_request(&range.end()), "04/11/2025 23:00");
        assert_eq!(args.backend, Backend::Http);
        assert_eq!(output_paths(&args, &reservoir).0, PathBuf::from("out.csv"));
    }

    #[test]
    fn test_reservoir_outside_catalogue_needs_range() {
        let args = parse(&["--id", "31", "--name", "Hồ Mới"]);
        let reservoir = resolve_reservoir(&args).unwrap();
        assert_eq!(reservoir.name, "Hồ Mới");
        assert!(resolve_range(&args, &reservoir).is_err());
        assert_eq!(
            output_paths(&args, &reservoir).1,
            PathBuf::from("hc_31_water_level.xlsx")
        );
    }

    #[test]
    fn test_unknown_reservoir_and_reversed_range() {
        assert!(resolve_reservoir(&parse(&["-r", "hoa-binh"])).is_err());
        let args = parse(&["--start", "05/11/2025 00:00", "--end", "04/11/2025 00:00"]);
        let reservoir = resolve_reservoir(&args).unwrap();
        assert!(resolve_range(&args, &reservoir).is_err());
    }

    /// Interrupt source that fires `count` times, then reports the signal
    /// stream as closed.
    fn signals(count: usize) -> impl FnMut() -> std::future::Ready<bool> {
        let mut left = count;
        move || {
            let fire = left > 0;
            left = left.saturating_sub(1);
            std::future::ready(fire)
        }
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_without_quitting() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut forced = false;
        watch_interrupts(signals(1), Arc::clone(&cancel), || forced = true).await;
        assert!(cancel.load(Ordering::SeqCst));
        assert!(!forced);
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_quit() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut forced = false;
        watch_interrupts(signals(2), Arc::clone(&cancel), || forced = true).await;
        assert!(cancel.load(Ordering::SeqCst));
        assert!(forced);
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_run_alone() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut forced = false;
        watch_interrupts(signals(0), Arc::clone(&cancel), || forced = true).await;
        assert!(!cancel.load(Ordering::SeqCst));
        assert!(!forced);
    }

    #[test]
    fn test_preview_does_not_overlap() {
        let samples: Vec<Sample> = (0..12).map(|h| sample(&format!("04/11/2025 {:02}:00", h))).collect();
        let (head, tail) = preview(&samples, 5);
        assert_eq!(head.len(), 5);
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0].requested_at, "04/11/2025 07:00");

        let (head, tail) = preview(&samples[..3], 5);
        assert_eq!(head.len(), 3);
        assert!(tail.is_empty());
    }
}
