//! Site-metadata table (`<group>_sitedata.txt`).
//!
//! Rows are comma separated with stable column positions; the site id is in
//! column 0 and the forcing years in columns 6..=8, with an optional UTC
//! offset in column 9. Rows that do not parse (headers, comments) are skipped.
use crate::error::{CaseError, CaseResult};
use std::path::{Path, PathBuf};

const START_COLUMN: usize = 6;
const END_COLUMN: usize = 7;
const ALIGN_COLUMN: usize = 8;
const UTC_OFFSET_COLUMN: usize = 9;

/// Forcing-year metadata for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub id: String,
    pub start_year: i32,
    pub end_year: i32,
    pub align_year: i32,
    pub utc_offset: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteTable {
    rows: Vec<SiteRecord>,
}

impl SiteTable {
    /// Conventional table location for a site group under the input data root.
    pub fn path_for(input_data: &Path, group: &str) -> PathBuf {
        input_data
            .join("lnd")
            .join("clm2")
            .join("PTCLM")
            .join(format!("{group}_sitedata.txt"))
    }

    pub fn load(path: &Path) -> CaseResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| CaseError::io("read site table", path, err))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let rows = text.lines().filter_map(parse_row).collect();
        Self { rows }
    }

    /// Look up a site; a repeated id resolves to its last row.
    pub fn get(&self, id: &str) -> Option<&SiteRecord> {
        self.rows.iter().rev().find(|row| row.id == id)
    }
}

fn parse_row(line: &str) -> Option<SiteRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let year = |column: usize| fields.get(column)?.parse::<i32>().ok();
    let id = fields.first().filter(|id| !id.is_empty())?;
    Some(SiteRecord {
        id: (*id).to_string(),
        start_year: year(START_COLUMN)?,
        end_year: year(END_COLUMN)?,
        align_year: year(ALIGN_COLUMN)?,
        utc_offset: year(UTC_OFFSET_COLUMN),
    })
}
