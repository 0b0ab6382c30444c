//! Model namelist overrides (`user_nl_elm`).
//!
//! Overrides are append-only and ordered. The model applies the last entry
//! when a key repeats; [`NamelistOverrideSet::deduplicated`] collapses
//! repeats ahead of time without changing which value wins.
use crate::directives::DirectiveSet;
use crate::resolve::ResolvedScenario;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

const AERO_FILE_REL: &str =
    "atm/cam/chem/trop_mozart_aero/aero/aerosoldep_rcp4.5_monthly_1849-2104_1.9x2.5_c100402.nc";
const TRANSIENT_HIST_MFILT: &str = "365";
const TRANSIENT_HIST_NHTFRQ: &str = "-24";

/// Run-directory file names for staged parameter and input files.
pub const PRIMARY_PARAMS_FILE: &str = "clm_params.nc";
pub const NUTRIENT_PARAMS_FILE: &str = "CNP_parameters.nc";
pub const DEMOGRAPHY_PARAMS_FILE: &str = "fates_params.nc";
pub const SURFACE_FILE: &str = "surfdata.nc";
pub const LAND_USE_FILE: &str = "surfdata.pftdyn.nc";
pub const DOMAIN_FILE: &str = "domain.nc";

/// One `key = value` line; the value is a Fortran literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamelistEntry {
    pub key: String,
    pub value: String,
}

impl NamelistEntry {
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl fmt::Display for NamelistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " {} = {}", self.key, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamelistOverrideSet {
    entries: Vec<NamelistEntry>,
}

impl NamelistOverrideSet {
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.entries.push(NamelistEntry::new(key, value));
    }

    /// Push a path as a quoted string literal.
    pub fn push_path(&mut self, key: &str, path: &Path) {
        self.push(key, quoted(path));
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = NamelistEntry>) {
        self.entries.extend(entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamelistEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value the model will see for `key` (last entry wins).
    pub fn effective(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Keep only the last entry per key, at that entry's position.
    pub fn deduplicated(&self) -> Self {
        let mut seen = BTreeSet::new();
        let mut kept: Vec<NamelistEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|entry| seen.insert(entry.key.as_str()))
            .cloned()
            .collect();
        kept.reverse();
        Self { entries: kept }
    }

    /// Render in the append format consumed by the toolchain.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{entry}\n"))
            .collect()
    }
}

/// Selects the history output used by spinup runs.
pub trait HistoryVarSelector {
    fn spinup_entries(&self, scenario: &ResolvedScenario) -> Vec<NamelistEntry>;
}

/// Annual, single-sample history of the carbon and nitrogen pools that
/// spinup diagnostics track.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnualSpinupHistory;

const SPINUP_HIST_VARS: &[&str] = &[
    "TOTECOSYSC",
    "TOTSOMC",
    "TOTVEGC",
    "TLAI",
    "GPP",
    "NEE",
    "TOTSOMN",
    "TOTVEGN",
    "CPOOL",
    "NPOOL",
];

impl HistoryVarSelector for AnnualSpinupHistory {
    fn spinup_entries(&self, scenario: &ResolvedScenario) -> Vec<NamelistEntry> {
        let mut vars: Vec<&str> = SPINUP_HIST_VARS.to_vec();
        if scenario.descriptor.compset.contains("CNP") {
            vars.extend(["TOTSOMP", "TOTVEGP", "PPOOL"]);
        }
        let list = vars
            .iter()
            .map(|var| format!("'{var}'"))
            .collect::<Vec<_>>()
            .join(", ");
        vec![
            NamelistEntry::new("hist_empty_htapes", ".true."),
            NamelistEntry::new("hist_fincl1", list),
            NamelistEntry::new("hist_mfilt", "1"),
            NamelistEntry::new("hist_nhtfrq", "-8760"),
        ]
    }
}

/// Accumulate namelist overrides for a scenario.
///
/// File paths default to the run directory named by the `RUNDIR` directive,
/// which is where the build phase stages them.
pub fn accumulate(
    scenario: &ResolvedScenario,
    directives: &DirectiveSet,
    history: &dyn HistoryVarSelector,
) -> NamelistOverrideSet {
    let descriptor = &scenario.descriptor;
    let files = &descriptor.files;
    let modes = scenario.modes;
    let run_dir = directives
        .value_of("RUNDIR")
        .map(Path::new)
        .unwrap_or(scenario.layout.run_dir.as_path());
    let mut set = NamelistOverrideSet::default();

    if let Some(restart) = &scenario.restart {
        set.push_path("finidat", &restart.file);
    }
    set.push("do_budgets", ".false.");
    let surface = files
        .surface
        .clone()
        .unwrap_or_else(|| run_dir.join(SURFACE_FILE));
    let domain = files
        .domain
        .clone()
        .unwrap_or_else(|| run_dir.join(DOMAIN_FILE));
    set.push_path("fsurdat", &surface);
    set.push_path("fatmlndfrc", &domain);

    if modes.transient {
        if files.suppress_land_use {
            set.push("flanduse_timeseries", "");
        } else {
            let land_use = files
                .land_use
                .clone()
                .unwrap_or_else(|| run_dir.join(LAND_USE_FILE));
            set.push_path("flanduse_timeseries", &land_use);
        }
        set.push("check_finidat_fsurdat_consistency", ".false.");
        set.push("check_finidat_year_consistency", ".false.");
        set.push("hist_mfilt", TRANSIENT_HIST_MFILT);
        set.push("hist_nhtfrq", TRANSIENT_HIST_NHTFRQ);
    } else {
        set.extend(history.spinup_entries(scenario));
    }

    set.push_path("paramfile", &run_dir.join(PRIMARY_PARAMS_FILE));
    set.push_path("fsoilordercon", &run_dir.join(NUTRIENT_PARAMS_FILE));
    if modes.fates {
        set.push_path("fates_paramfile", &run_dir.join(DEMOGRAPHY_PARAMS_FILE));
    }
    set.push("nyears_ad_carbon_only", "25");
    set.push("spinup_mortality_factor", "10");

    if modes.bypass {
        set.push("metdata_type", format!("'{}'", scenario.forcing.kind));
        set.push_path("metdata_bypass", &scenario.forcing.directory);
        set.push_path("co2_file", &scenario.co2_file);
        set.push_path("aero_file", &scenario.roots.input_data.join(AERO_FILE_REL));
    }
    set
}

fn quoted(path: &Path) -> String {
    format!("'{}'", path.display())
}

/// Read `key` from generated namelist text such as `lnd_in`.
///
/// The last assignment wins; surrounding quotes are stripped.
pub fn namelist_value(text: &str, key: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .rev()
        .find(|(name, _)| name.trim() == key)
        .map(|(_, value)| {
            value
                .trim()
                .trim_end_matches(',')
                .trim_matches(|c| c == '\'' || c == '"')
                .to_string()
        })
}

#[cfg(test)]
#[path = "namelist_tests.rs"]
mod tests;
