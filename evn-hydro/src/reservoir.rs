use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use evn_utils::timestamps::parse_request;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// Embedded CSV data for the reservoirs with known portal identifiers.
pub static CSV_OBJECT: &str = include_str!("../../fixtures/reservoirs.csv");

/// A hydropower reservoir as listed on the EVN portal.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Reservoir {
    /// Site-assigned identifier, sent as the `hc` query parameter
    pub id: String,
    /// Display name as it appears in the portal's table
    pub name: String,
    /// Short ASCII handle used on the command line and in file names
    pub slug: String,
    /// Start of the range collected when none is given
    pub default_start: Option<NaiveDateTime>,
    /// End of the range collected when none is given
    pub default_end: Option<NaiveDateTime>,
}

impl Reservoir {
    /// A reservoir outside the bundled catalogue.
    pub fn new(id: &str, name: &str) -> Reservoir {
        Reservoir {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            slug: format!("hc-{}", id.trim()),
            default_start: None,
            default_end: None,
        }
    }

    /// Get the reservoir vector from the embedded catalogue.
    pub fn get_reservoir_vector() -> Result<Vec<Reservoir>> {
        Reservoir::parse_reservoir_csv(CSV_OBJECT)
    }

    /// Look a reservoir up in the embedded catalogue by slug, id or name.
    pub fn find(selector: &str) -> Result<Reservoir> {
        let reservoirs = Reservoir::get_reservoir_vector()?;
        Reservoir::find_in(&reservoirs, selector)
            .cloned()
            .ok_or_else(|| ScrapeError::ReservoirNotFound(selector.to_string()))
    }

    /// Look a reservoir up in `reservoirs` by slug, id or name.
    pub fn find_in<'a>(reservoirs: &'a [Reservoir], selector: &str) -> Option<&'a Reservoir> {
        let selector = selector.trim();
        let lowered = selector.to_lowercase();
        reservoirs.iter().find(|r| {
            r.slug.eq_ignore_ascii_case(selector)
                || r.id == selector
                || r.name.to_lowercase() == lowered
        })
    }

    /// File name stem for exported data, e.g. `song_ba_ha_water_level`.
    pub fn output_stem(&self) -> String {
        format!("{}_water_level", self.slug.replace('-', "_"))
    }

    fn parse_optional_timestamp(value: Option<&str>, line: usize) -> Result<Option<NaiveDateTime>> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => parse_request(s)
                .map(Some)
                .map_err(|e| ScrapeError::Catalogue(format!("line {}: {}", line, e))),
        }
    }

    /// Parse a CSV string of reservoir data into a vector of Reservoirs.
    ///
    /// Expected CSV columns: id, name, slug, default start, default end.
    /// The two timestamps use the portal format and may be blank.
    pub fn parse_reservoir_csv(csv_object: &str) -> Result<Vec<Reservoir>> {
        let mut reservoir_list: Vec<Reservoir> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_object.as_bytes());
        for (index, row) in rdr.records().enumerate() {
            let rho = row?;
            // header occupies line 1
            let line = index + 2;
            let field = |i: usize, what: &str| -> Result<String> {
                match rho.get(i).map(str::trim) {
                    Some(v) if !v.is_empty() => Ok(v.to_string()),
                    _ => Err(ScrapeError::Catalogue(format!("line {}: missing {}", line, what))),
                }
            };
            let reservoir = Reservoir {
                id: field(0, "id")?,
                name: field(1, "name")?,
                slug: field(2, "slug")?,
                default_start: Reservoir::parse_optional_timestamp(rho.get(3), line)?,
                default_end: Reservoir::parse_optional_timestamp(rho.get(4), line)?,
            };
            reservoir_list.push(reservoir);
        }
        Ok(reservoir_list)
    }
}
