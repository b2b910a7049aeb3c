use serde::{Deserialize, Serialize};
use std::fmt;

/// Output column headers, in export order.
pub const COLUMNS: [&str; 12] = [
    "Tên hồ",
    "Thời điểm",
    "Htl (m)",
    "Hdbt (m)",
    "Hc (m)",
    "Qve (m3/s)",
    "ΣQx (m3/s)",
    "Qxt (m3/s)",
    "Qxm (m3/s)",
    "Ncxs",
    "Ncxm",
    "Thời điểm yêu cầu",
];

/// Minimum number of `td` cells a table row needs to map onto a [`Sample`].
pub const ROW_CELLS: usize = 11;

/// One reservoir reading at one requested hour.
///
/// Every value is kept exactly as the portal rendered it. A cell that is
/// missing or blank is stored as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Tên hồ")]
    pub reservoir_name: String,
    /// Timestamp as echoed by the page
    #[serde(rename = "Thời điểm")]
    pub observed_at: String,
    #[serde(rename = "Htl (m)")]
    pub upstream_level: String,
    #[serde(rename = "Hdbt (m)")]
    pub design_level: String,
    #[serde(rename = "Hc (m)")]
    pub downstream_level: String,
    #[serde(rename = "Qve (m3/s)")]
    pub inflow: String,
    #[serde(rename = "ΣQx (m3/s)")]
    pub total_outflow: String,
    #[serde(rename = "Qxt (m3/s)")]
    pub scheduled_outflow: String,
    #[serde(rename = "Qxm (m3/s)")]
    pub actual_outflow: String,
    #[serde(rename = "Ncxs")]
    pub deep_gates: String,
    #[serde(rename = "Ncxm")]
    pub surface_gates: String,
    /// Timestamp that was asked for, "DD/MM/YYYY HH:MM"
    #[serde(rename = "Thời điểm yêu cầu")]
    pub requested_at: String,
}

impl Sample {
    /// Map the text of a table row's cells onto a sample.
    ///
    /// Returns `None` when fewer than [`ROW_CELLS`] cells are given. The
    /// first cell carries the reservoir name with a timestamp on a second
    /// line; only the first line is kept.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Option<Sample> {
        if cells.len() < ROW_CELLS {
            return None;
        }
        let cell = |i: usize| cells[i].as_ref().trim().to_string();
        let name = cells[0]
            .as_ref()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Some(Sample {
            reservoir_name: name,
            observed_at: cell(1),
            upstream_level: cell(2),
            design_level: cell(3),
            downstream_level: cell(4),
            inflow: cell(5),
            total_outflow: cell(6),
            scheduled_outflow: cell(7),
            actual_outflow: cell(8),
            deep_gates: cell(9),
            surface_gates: cell(10),
            requested_at: String::new(),
        })
    }

    /// Attach the originally requested timestamp.
    pub fn with_requested_at(mut self, requested_at: impl Into<String>) -> Sample {
        self.requested_at = requested_at.into();
        self
    }

    /// Values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 12] {
        [
            self.reservoir_name.as_str(),
            self.observed_at.as_str(),
            self.upstream_level.as_str(),
            self.design_level.as_str(),
            self.downstream_level.as_str(),
            self.inflow.as_str(),
            self.total_outflow.as_str(),
            self.scheduled_outflow.as_str(),
            self.actual_outflow.as_str(),
            self.deep_gates.as_str(),
            self.surface_gates.as_str(),
            self.requested_at.as_str(),
        ]
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | Htl {} | Hc {} | Qve {} | ΣQx {}",
            self.requested_at,
            self.reservoir_name,
            self.upstream_level,
            self.downstream_level,
            self.inflow,
            self.total_outflow
        )
    }
}

/// Samples in the order they were requested. Hours without data are simply
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SampleSet(Vec<Sample>);

impl SampleSet {
    pub fn new() -> SampleSet {
        SampleSet(Vec::new())
    }

    pub fn push(&mut self, sample: Sample) {
        self.0.push(sample);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.0
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        SampleSet(samples)
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
