//! Case descriptors: the sparse, caller-supplied description of one run.
//!
//! A descriptor is deserialized once from the run request and never mutated
//! afterwards; everything derived from it lives in
//! [`ResolvedScenario`](crate::resolve::ResolvedScenario).
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod modes;

pub use modes::{ClimateEpoch, ModeFlags, ModeOverrides};

/// Default experiment family when the request omits one.
pub const DEFAULT_COMPSET: &str = "ICBELMBC";
/// Default site group used to locate the site-metadata table.
pub const DEFAULT_SITE_GROUP: &str = "AmeriFlux";

/// Sparse description of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseDescriptor {
    /// Case id prefix; defaults to today's date as `YYYYMMDD`.
    #[serde(default = "default_case_id")]
    pub case_id: String,
    /// Experiment family tag (compset name or free text carrying markers).
    pub compset: String,
    /// Case name suffix, e.g. `_ad_spinup` or `_trans`.
    pub suffix: String,
    pub site: Option<String>,
    pub site_group: String,
    pub region: Option<RegionSpec>,
    pub modes: ModeOverrides,
    pub processors: u32,
    pub timestep_hours: f64,
    pub run_years: u32,
    pub start_year: Option<i32>,
    pub restart: Option<RestartLineage>,
    pub forcing: ForcingRequest,
    pub files: UserFiles,
    pub parameters: ParameterFiles,
    pub co2_file: Option<PathBuf>,
    /// Extra CPP defines passed through `ELM_CONFIG_OPTS`.
    pub cppdefs: Vec<String>,
    /// Directory copied into the case `SourceMods/`.
    pub srcmods: Option<PathBuf>,
    /// Namelist file appended verbatim after the computed overrides.
    pub extra_namelist: Option<PathBuf>,
}

impl Default for CaseDescriptor {
    fn default() -> Self {
        Self {
            case_id: default_case_id(),
            compset: DEFAULT_COMPSET.to_string(),
            suffix: String::new(),
            site: None,
            site_group: DEFAULT_SITE_GROUP.to_string(),
            region: None,
            modes: ModeOverrides::default(),
            processors: 1,
            timestep_hours: 1.0,
            run_years: 1,
            start_year: None,
            restart: None,
            forcing: ForcingRequest::default(),
            files: UserFiles::default(),
            parameters: ParameterFiles::default(),
            co2_file: None,
            cppdefs: Vec::new(),
            srcmods: None,
            extra_namelist: None,
        }
    }
}

/// Today's date as `YYYYMMDD`, the conventional case id prefix.
pub fn default_case_id() -> String {
    let today = time::OffsetDateTime::now_utc().date();
    format!(
        "{:04}{:02}{:02}",
        today.year(),
        u8::from(today.month()),
        today.day()
    )
}

/// Rectangular region request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionSpec {
    pub name: Option<String>,
    pub lat_bounds: [f64; 2],
    pub lon_bounds: [f64; 2],
}

impl Default for RegionSpec {
    fn default() -> Self {
        Self {
            name: None,
            lat_bounds: [-90.0, 90.0],
            lon_bounds: [-180.0, 180.0],
        }
    }
}

impl RegionSpec {
    /// Bounds must be ordered and inside the valid lat/lon domain.
    pub fn has_valid_bounds(&self) -> bool {
        let [lat0, lat1] = self.lat_bounds;
        let [lon0, lon1] = self.lon_bounds;
        (-90.0..=90.0).contains(&lat0)
            && (-90.0..=90.0).contains(&lat1)
            && lat0 < lat1
            && (-180.0..=360.0).contains(&lon0)
            && (-180.0..=360.0).contains(&lon1)
            && lon0 < lon1
    }
}

/// Where initial conditions come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum RestartLineage {
    /// Restart written by a previous case under the same run root.
    Case { case: String, year: u32 },
    /// Explicit restart file whose name ends in `YYYY-01-01-00000.nc`.
    File { path: PathBuf },
}

/// Optional explicit forcing selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForcingRequest {
    pub directory: Option<PathBuf>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Caller-supplied domain, surface, and land-use files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserFiles {
    pub domain: Option<PathBuf>,
    pub surface: Option<PathBuf>,
    pub land_use: Option<PathBuf>,
    /// Blank the land-use timeseries instead of pointing at a file.
    pub suppress_land_use: bool,
}

/// Caller-supplied parameter files; defaults come from the case `lnd_in`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterFiles {
    pub primary: Option<PathBuf>,
    pub nutrient: Option<PathBuf>,
    pub demography: Option<PathBuf>,
}
