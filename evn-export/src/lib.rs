//! Writers for collected samples.
//!
//! Both formats carry the same twelve columns in [`COLUMNS`] order. CSV
//! output starts with a UTF-8 byte order mark so spreadsheet programs read
//! the Vietnamese headers correctly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use evn_hydro::sample::{SampleSet, COLUMNS};
use log::info;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

/// UTF-8 byte order mark.
pub const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors raised while writing output files
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write XLSX: {0}")]
    Xlsx(#[from] XlsxError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Write `samples` as BOM-prefixed CSV to `writer`.
pub fn write_csv_to<W: Write>(samples: &SampleSet, mut writer: W) -> Result<()> {
    writer.write_all(BOM)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for sample in samples {
        wtr.write_record(sample.values())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `samples` as BOM-prefixed CSV to the file at `path`.
pub fn write_csv<P: AsRef<Path>>(samples: &SampleSet, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    write_csv_to(samples, file)?;
    info!("Data saved to {}", path.as_ref().display());
    Ok(())
}

/// Write `samples` to a single-sheet workbook at `path`, header row in bold.
pub fn write_xlsx<P: AsRef<Path>>(samples: &SampleSet, path: P) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (row, sample) in samples.iter().enumerate() {
        for (col, value) in sample.values().iter().enumerate() {
            worksheet.write_string(row as u32 + 1, col as u16, *value)?;
        }
    }
    workbook.save(path.as_ref())?;
    info!("Data saved to {}", path.as_ref().display());
    Ok(())
}

/// Write whichever of the two formats has a path. Returns the files
/// written.
pub fn export(samples: &SampleSet, csv: Option<&Path>, xlsx: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let Some(path) = csv {
        write_csv(samples, path)?;
        written.push(path.to_path_buf());
    }
    if let Some(path) = xlsx {
        write_xlsx(samples, path)?;
        written.push(path.to_path_buf());
    }
    Ok(written)
}
