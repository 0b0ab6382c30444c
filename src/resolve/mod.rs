//! Scenario resolution: sparse descriptor in, fully determined run out.
//!
//! Resolution is pure given its tables. The only I/O lives in the table
//! loaders, which the caller runs before [`resolve`].
use crate::case::{CaseDescriptor, ModeFlags, RegionSpec, RestartLineage};
use crate::error::{CaseError, CaseResult};
use crate::settings::RootDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod forcing;
mod sites;

pub use forcing::{Forcing, ForcingTable, DEFAULT_FORCING, SITE_FORCING};
pub use sites::{SiteRecord, SiteTable};

use forcing::{select_forcing, ForcingQuery};

const SITE_RESOLUTION: &str = "ELM_USRDAT";
const REGION_RESOLUTION: &str = "r05_r05";
const DEFAULT_REGION_NAME: &str = "region";
const REANALYSIS_SPINUP_YEARS: i32 = 20;
const TRANSIENT_MET_END_YEAR: i32 = 2014;
const RESTART_STAMP_TAIL: &str = "-01-01-00000.nc";
const DEFAULT_CO2_REL: &str = "atm/datm7/CO2/fco2_datm_rcp4.5_1765-2500_c130312.nc";

/// Tables and settings resolution reads from.
pub struct ResolveContext<'a> {
    pub roots: &'a RootDirs,
    pub machine: &'a str,
    pub forcing_table: &'a ForcingTable,
    /// Required when the descriptor names a site.
    pub site_table: Option<&'a SiteTable>,
}

/// Load the site table for a site descriptor; regions need none.
pub fn load_site_table(
    descriptor: &CaseDescriptor,
    roots: &RootDirs,
) -> CaseResult<Option<SiteTable>> {
    if descriptor.site.is_none() {
        return Ok(None);
    }
    let path = SiteTable::path_for(&roots.input_data, &descriptor.site_group);
    if !path.is_file() {
        return Err(CaseError::resolution(format!(
            "site table {} does not exist",
            path.display()
        )));
    }
    SiteTable::load(&path).map(Some)
}

/// Exactly one of site or region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Location {
    Site { id: String, group: String },
    Region { name: String, bounds: RegionSpec },
}

impl Location {
    /// Label used in the case name.
    pub fn label(&self) -> &str {
        match self {
            Location::Site { id, .. } => id,
            Location::Region { name, .. } => name,
        }
    }

    pub fn site(&self) -> Option<&str> {
        match self {
            Location::Site { id, .. } => Some(id),
            Location::Region { .. } => None,
        }
    }
}

/// Forcing years used for stream cycling and spinup length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetYears {
    pub start: i32,
    pub end: i32,
    pub align: i32,
    pub spinup_years: i32,
    pub utc_offset: Option<i32>,
}

/// Initial-condition file plus the year it was written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartBinding {
    pub file: PathBuf,
    pub year: u32,
}

impl RestartBinding {
    /// `YYYY-01-01-00000`, the date segment of restart file names.
    pub fn date_stamp(&self) -> String {
        format!("{:04}-01-01-00000", self.year)
    }

    /// `YYYY-01-01`, the reference date handed to the toolchain.
    pub fn ref_date(&self) -> String {
        format!("{:04}-01-01", self.year)
    }
}

/// Name and directories of the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseLayout {
    pub name: String,
    pub case_dir: PathBuf,
    pub run_dir: PathBuf,
    pub exe_root: PathBuf,
    /// False when a prebuilt exe root was supplied.
    pub build_required: bool,
}

/// Fully determined run parameters. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub descriptor: CaseDescriptor,
    pub roots: RootDirs,
    pub machine: String,
    pub location: Location,
    pub modes: ModeFlags,
    pub resolution: String,
    pub layout: CaseLayout,
    pub start_year: i32,
    pub forcing: Forcing,
    pub met: MetYears,
    pub restart: Option<RestartBinding>,
    pub co2_file: PathBuf,
}

impl ResolvedScenario {
    pub fn site(&self) -> Option<&str> {
        self.location.site()
    }

    pub fn is_site(&self) -> bool {
        self.location.site().is_some()
    }
}

/// Resolve a descriptor against the given tables.
pub fn resolve(
    descriptor: &CaseDescriptor,
    context: &ResolveContext<'_>,
) -> CaseResult<ResolvedScenario> {
    let location = resolve_location(descriptor)?;
    validate_run_shape(descriptor)?;
    let roots = context.roots;

    let restart = descriptor
        .restart
        .as_ref()
        .map(|lineage| resolve_restart(lineage, &roots.run))
        .transpose()?;
    let modes = ModeFlags::resolve(
        &descriptor.compset,
        &descriptor.suffix,
        &descriptor.modes,
        restart.is_some(),
    );

    let forcing = select_forcing(
        &ForcingQuery {
            site: location.site(),
            kind: descriptor.forcing.kind.as_deref(),
            directory: descriptor.forcing.directory.as_deref(),
            bypass: modes.bypass,
        },
        &roots.input_data,
        context.forcing_table,
    )?;

    let site_record = match location.site() {
        Some(site) => {
            let table = context.site_table.ok_or_else(|| {
                CaseError::resolution(format!("no site table loaded for site {site}"))
            })?;
            let record = table.get(site).ok_or_else(|| {
                CaseError::resolution(format!(
                    "site {site} not found in the {} site table",
                    descriptor.site_group
                ))
            })?;
            Some(record)
        }
        None => None,
    };
    let met = resolve_met_years(&forcing, site_record, modes.transient)?;

    let start_year = descriptor.start_year.unwrap_or(if modes.transient {
        1850
    } else {
        match modes.epoch {
            crate::case::ClimateEpoch::Preindustrial => 1,
            crate::case::ClimateEpoch::PresentDay => 2000,
        }
    });

    let name = format!(
        "{}_{}_{}{}",
        descriptor.case_id,
        location.label(),
        descriptor.compset,
        descriptor.suffix
    );
    let layout = CaseLayout {
        case_dir: roots.case.join(&name),
        run_dir: roots.run.join(&name).join("run"),
        exe_root: roots
            .exe
            .clone()
            .unwrap_or_else(|| roots.run.join(&name).join("bld")),
        build_required: roots.exe.is_none(),
        name,
    };

    let resolution = if location.site().is_some() {
        SITE_RESOLUTION
    } else {
        REGION_RESOLUTION
    };

    Ok(ResolvedScenario {
        co2_file: descriptor
            .co2_file
            .clone()
            .unwrap_or_else(|| roots.input_data.join(DEFAULT_CO2_REL)),
        descriptor: descriptor.clone(),
        roots: roots.clone(),
        machine: context.machine.to_string(),
        location,
        modes,
        resolution: resolution.to_string(),
        layout,
        start_year,
        forcing,
        met,
        restart,
    })
}

fn resolve_location(descriptor: &CaseDescriptor) -> CaseResult<Location> {
    let site = descriptor
        .site
        .as_deref()
        .map(str::trim)
        .filter(|site| !site.is_empty());
    match (site, &descriptor.region) {
        (Some(_), Some(_)) => Err(CaseError::resolution(
            "descriptor sets both a site and a region; choose one",
        )),
        (None, None) => Err(CaseError::resolution(
            "descriptor sets neither a site nor a region",
        )),
        (Some(site), None) => Ok(Location::Site {
            id: site.to_string(),
            group: descriptor.site_group.clone(),
        }),
        (None, Some(region)) => {
            if !region.has_valid_bounds() {
                return Err(CaseError::resolution(format!(
                    "invalid region bounds lat={:?} lon={:?}",
                    region.lat_bounds, region.lon_bounds
                )));
            }
            Ok(Location::Region {
                name: region
                    .name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_REGION_NAME.to_string()),
                bounds: region.clone(),
            })
        }
    }
}

const STEP_TOLERANCE: f64 = 1e-9;

fn validate_run_shape(descriptor: &CaseDescriptor) -> CaseResult<()> {
    if descriptor.case_id.trim().is_empty() {
        return Err(CaseError::resolution("case id must be non-empty"));
    }
    if descriptor.compset.trim().is_empty() {
        return Err(CaseError::resolution("experiment family must be non-empty"));
    }
    if descriptor.processors == 0 {
        return Err(CaseError::resolution("processor count must be at least 1"));
    }
    if descriptor.run_years == 0 {
        return Err(CaseError::resolution("run length must be at least 1 year"));
    }
    let tstep = descriptor.timestep_hours;
    if !tstep.is_finite() || tstep <= 0.0 || tstep > 24.0 {
        return Err(CaseError::resolution(format!(
            "timestep must be in (0, 24] hours (got {tstep})"
        )));
    }
    let steps = 24.0 / tstep;
    if (steps - steps.round()).abs() > STEP_TOLERANCE {
        return Err(CaseError::resolution(format!(
            "timestep must divide 24 hours evenly (got {tstep})"
        )));
    }
    Ok(())
}

fn resolve_restart(lineage: &RestartLineage, run_root: &Path) -> CaseResult<RestartBinding> {
    match lineage {
        RestartLineage::Case { case, year } => {
            let stamp = format!("{year:04}");
            let file = run_root
                .join(case)
                .join("run")
                .join(format!("{case}.elm.r.{stamp}{RESTART_STAMP_TAIL}"));
            Ok(RestartBinding { file, year: *year })
        }
        RestartLineage::File { path } => Ok(RestartBinding {
            year: restart_year_from_file(path)?,
            file: path.clone(),
        }),
    }
}

fn restart_year_from_file(path: &Path) -> CaseResult<u32> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let head = name.strip_suffix(RESTART_STAMP_TAIL).ok_or_else(|| {
        CaseError::resolution(format!(
            "restart file {} does not end in YYYY{RESTART_STAMP_TAIL}",
            path.display()
        ))
    })?;
    head.len()
        .checked_sub(4)
        .and_then(|idx| head.get(idx..))
        .and_then(|year| year.parse::<u32>().ok())
        .ok_or_else(|| {
            CaseError::resolution(format!(
                "cannot read restart year from {}",
                path.display()
            ))
        })
}

fn resolve_met_years(
    forcing: &Forcing,
    site: Option<&SiteRecord>,
    transient: bool,
) -> CaseResult<MetYears> {
    let met = match (forcing.is_site(), site) {
        (true, Some(site)) => MetYears {
            start: site.start_year,
            end: site.end_year,
            align: site.align_year,
            spinup_years: site.end_year - site.start_year + 1,
            utc_offset: site.utc_offset,
        },
        (true, None) => {
            return Err(CaseError::resolution(
                "site forcing requires a site with metadata",
            ))
        }
        (false, site) => {
            let start = forcing.reanalysis_start_year();
            let end = if transient {
                TRANSIENT_MET_END_YEAR
            } else {
                start + REANALYSIS_SPINUP_YEARS - 1
            };
            MetYears {
                start,
                end,
                align: site.map_or(start, |site| site.align_year),
                spinup_years: REANALYSIS_SPINUP_YEARS,
                utc_offset: site.and_then(|site| site.utc_offset),
            }
        }
    };
    if met.start > met.end {
        return Err(CaseError::resolution(format!(
            "forcing year range is empty ({}..{})",
            met.start, met.end
        )));
    }
    Ok(met)
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
