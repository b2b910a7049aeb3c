//! Reads one reservoir's row out of the portal's data table.
//!
//! The table is found by its `tblgridtd` class. The target row is the first
//! whose name cell equals the reservoir name. When no row matches exactly,
//! the first row whose text merely contains the name is taken instead, so
//! "Ba Hạ" would also match "Sông Ba Hạ". A matched row needs at least
//! [`ROW_CELLS`] cells.

use std::time::Duration;

use log::{debug, warn};
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{ExtractError, FetchFailure, RenderError};
use crate::render::RenderClient;
use crate::sample::{Sample, ROW_CELLS};

/// CSS selector of the data table.
pub const TABLE_SELECTOR: &str = "table.tblgridtd";

/// How long to wait for the table to appear.
pub const TABLE_WAIT: Duration = Duration::from_secs(10);

/// How a row was matched to the reservoir name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMatch {
    Exact,
    Substring,
}

/// Rows currently in the table, and whether one of them names the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableState {
    pub rows: usize,
    pub has_target: bool,
}

#[derive(Debug, Clone)]
pub struct RowExtractor {
    table_selector: String,
    table: Selector,
    row: Selector,
    cell: Selector,
    table_wait: Duration,
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::Selector(selector.to_string()))
}

/// Text of an element, with `<br>` and block elements starting new lines
/// and runs of whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(e) if matches!(e.name(), "br" | "div" | "p") => raw.push('\n'),
            _ => {}
        }
    }
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl RowExtractor {
    pub fn new() -> Result<RowExtractor, ExtractError> {
        RowExtractor::with_table_selector(TABLE_SELECTOR)
    }

    pub fn with_table_selector(table_selector: &str) -> Result<RowExtractor, ExtractError> {
        Ok(RowExtractor {
            table_selector: table_selector.to_string(),
            table: parse_selector(table_selector)?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            table_wait: TABLE_WAIT,
        })
    }

    pub fn with_table_wait(mut self, table_wait: Duration) -> RowExtractor {
        self.table_wait = table_wait;
        self
    }

    /// Wait for the table on the client's current page, then extract the
    /// row for `name`.
    ///
    /// A missing row is `Ok(None)`.
    pub async fn extract<C: RenderClient>(
        &self,
        client: &mut C,
        name: &str,
    ) -> Result<Option<Sample>, FetchFailure> {
        match client.wait_for(&self.table_selector, self.table_wait).await {
            Ok(()) => {}
            Err(RenderError::Timeout { .. }) => {
                return Err(ExtractError::TableNotFound(self.table_selector.clone()).into())
            }
            Err(e) => return Err(e.into()),
        }
        let html = client.content().await?;
        Ok(self.extract_from_html(&html, name)?)
    }

    /// Extract the row for `name` from a rendered document.
    pub fn extract_from_html(&self, html: &str, name: &str) -> Result<Option<Sample>, ExtractError> {
        let document = Html::parse_document(html);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ExtractError::TableNotFound(self.table_selector.clone()))?;
        let rows: Vec<ElementRef<'_>> = table.select(&self.row).collect();
        let Some((row, matched)) = self.locate(&rows, name) else {
            return Ok(None);
        };
        if matched == RowMatch::Substring {
            warn!("No exact row for '{}', using first row containing it", name);
        }
        let cells: Vec<String> = row.select(&self.cell).map(element_text).collect();
        debug!("matched row for '{}' with {} cells", name, cells.len());
        Sample::from_cells(&cells)
            .map(Some)
            .ok_or_else(|| ExtractError::MalformedRow {
                name: name.to_string(),
                cells: cells.len(),
                expected: ROW_CELLS,
            })
    }

    /// Row count of the table and whether `name` appears in it. A page
    /// without the table reports zero rows.
    pub fn table_state(&self, html: &str, name: &str) -> TableState {
        let document = Html::parse_document(html);
        let Some(table) = document.select(&self.table).next() else {
            return TableState::default();
        };
        let rows: Vec<ElementRef<'_>> = table.select(&self.row).collect();
        TableState {
            rows: rows.len(),
            has_target: self.locate(&rows, name).is_some(),
        }
    }

    fn name_cell(&self, row: &ElementRef<'_>) -> Option<String> {
        let first = row.select(&self.cell).next()?;
        element_text(first).lines().next().map(str::to_string)
    }

    fn locate<'a>(&self, rows: &[ElementRef<'a>], name: &str) -> Option<(ElementRef<'a>, RowMatch)> {
        let target = name.trim();
        if target.is_empty() {
            return None;
        }
        rows.iter()
            .find(|row| self.name_cell(row).as_deref() == Some(target))
            .map(|row| (*row, RowMatch::Exact))
            .or_else(|| {
                rows.iter()
                    .find(|row| element_text(**row).contains(target))
                    .map(|row| (*row, RowMatch::Substring))
            })
    }
}
