//! Forcing-family table and forcing selection rules.
use crate::error::{CaseError, CaseResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Forcing type for point data extracted at a single site.
pub const SITE_FORCING: &str = "site";
/// Reanalysis family used when nothing else is specified.
pub const DEFAULT_FORCING: &str = "gswp3";
const DEFAULT_FORCING_REL: &str = "atm/datm7/atm_forcing.datm7.GSWP3.0.5d.v2.c180716";
const BYPASS_SUBDIR: &str = "cpl_bypass_full";

/// Family name to input-data-relative directory, from `name:path` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcingTable {
    families: BTreeMap<String, String>,
}

impl ForcingTable {
    pub fn load(path: &Path) -> CaseResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| CaseError::io("read forcing table", path, err))?;
        Ok(Self::parse(&text))
    }

    /// Later lines for the same family replace earlier ones.
    pub fn parse(text: &str) -> Self {
        let families = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(name, path)| (name.trim().to_string(), path.trim().to_string()))
            .collect();
        Self { families }
    }

    pub fn directory(&self, family: &str) -> Option<&str> {
        self.families.get(family).map(String::as_str)
    }
}

/// Selected forcing type and data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forcing {
    pub kind: String,
    pub directory: PathBuf,
}

impl Forcing {
    pub fn is_site(&self) -> bool {
        self.kind == SITE_FORCING
    }

    /// First year of the reanalysis record for this family.
    pub fn reanalysis_start_year(&self) -> i32 {
        if self.kind.contains("daymet") {
            1980
        } else if self.kind.contains("Qian") {
            1948
        } else {
            1901
        }
    }
}

/// Inputs to forcing selection, borrowed from the descriptor.
pub(crate) struct ForcingQuery<'a> {
    pub site: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub directory: Option<&'a Path>,
    pub bypass: bool,
}

pub(crate) fn select_forcing(
    query: &ForcingQuery<'_>,
    input_data: &Path,
    table: &ForcingTable,
) -> CaseResult<Forcing> {
    let kind = query.kind.map(str::trim).filter(|kind| !kind.is_empty());
    if let Some(directory) = query.directory {
        let kind = match (query.site, kind) {
            (_, Some(kind)) => kind,
            (Some(_), None) => SITE_FORCING,
            (None, None) => {
                return Err(CaseError::resolution(
                    "an explicit forcing directory requires a forcing type (e.g. gswp3)",
                ))
            }
        };
        return Ok(Forcing {
            kind: kind.to_string(),
            directory: directory.to_path_buf(),
        });
    }

    let (kind, mut directory) = match (query.site, kind) {
        (Some(site), None) | (Some(site), Some(SITE_FORCING)) => (
            SITE_FORCING.to_string(),
            input_data
                .join("atm/datm7/CLM1PT_data")
                .join(format!("1x1pt_{site}")),
        ),
        (_, Some(kind)) => {
            let rel = table.directory(kind).ok_or_else(|| {
                CaseError::resolution(format!("forcing type {kind:?} not found in forcing table"))
            })?;
            (kind.to_string(), input_data.join(rel))
        }
        (None, None) => {
            tracing::info!("no site, forcing type, or directory given; defaulting to GSWP3");
            (
                DEFAULT_FORCING.to_string(),
                input_data.join(DEFAULT_FORCING_REL),
            )
        }
    };
    if query.bypass {
        directory.push(BYPASS_SUBDIR);
    }
    Ok(Forcing { kind, directory })
}
