/// Error types for the EVN scraping library
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a render session
#[derive(Error, Debug)]
pub enum RenderError {
    /// The session was never opened or has already been closed
    #[error("render session is not open")]
    NotOpen,

    /// The rendering engine could not be started
    #[error("failed to start render session: {0}")]
    Launch(String),

    /// A page load failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// An element did not appear in time
    #[error("timed out after {after:?} waiting for '{selector}'")]
    Timeout { selector: String, after: Duration },

    /// The rendered document could not be read
    #[error("failed to read page content: {0}")]
    Content(String),
}

impl RenderError {
    /// Session level failures end the whole run; everything else only
    /// costs the current hour.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::NotOpen | RenderError::Launch(_))
    }
}

/// Failures while reading the reservoir table out of a rendered page
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    /// The data table never appeared
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The matched row is too short to map onto a sample
    #[error("row for '{name}' has {cells} cells, expected at least {expected}")]
    MalformedRow {
        name: String,
        cells: usize,
        expected: usize,
    },

    /// A CSS selector failed to parse
    #[error("invalid selector '{0}'")]
    Selector(String),
}

/// Why a single hour produced no sample
#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Main error type for scraping runs
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The render session failed; the run cannot continue
    #[error("render session failed: {0}")]
    Session(#[source] RenderError),

    /// Reservoir not found in the catalogue
    #[error("reservoir not found: {0}")]
    ReservoirNotFound(String),

    /// Failed to parse CSV data
    #[error("failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Invalid reservoir catalogue entry
    #[error("invalid reservoir catalogue: {0}")]
    Catalogue(String),

    /// Start of the requested range lies after its end
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    /// Step of zero hours
    #[error("step must be at least one hour")]
    InvalidStep,

    /// Extractor configuration error
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Type alias for Results using ScrapeError
pub type Result<T> = std::result::Result<T, ScrapeError>;
