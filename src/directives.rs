//! System-setting directives compiled from a resolved scenario.
//!
//! A [`DirectiveSet`] is append-only: duplicate keys are kept in order and
//! the consuming toolchain decides what a repeated key means.
use crate::resolve::ResolvedScenario;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Coupled components that all receive the same task and thread counts.
pub const COMPONENTS: [&str; 10] = [
    "ATM", "LND", "ICE", "OCN", "CPL", "GLC", "ROF", "WAV", "ESP", "IAC",
];
const PIO_VERSION: u32 = 2;
const NETCDF_MACHINE_MARKERS: [&str; 3] = ["mac", "cades", "linux"];
/// Model timestep that needs no `ATM_NCPL` override.
const NATIVE_TIMESTEP_HOURS: f64 = 0.5;
const REGION_REST_N: u32 = 20;
const BYPASS_DEFINE: &str = "-DCPL_BYPASS";
const DEFAULT_DOMAIN_FILE: &str = "domain.nc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveMode {
    Set,
    Append,
}

/// One `xmlchange` instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub key: String,
    pub value: String,
    pub mode: DirectiveMode,
}

impl Directive {
    pub fn set(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
            mode: DirectiveMode::Set,
        }
    }

    /// Arguments for the `xmlchange` script.
    pub fn xmlchange_args(&self) -> Vec<String> {
        let assignment = format!("{}={}", self.key, self.value);
        match self.mode {
            DirectiveMode::Set => vec![assignment],
            DirectiveMode::Append => vec!["--append".to_string(), assignment],
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            DirectiveMode::Set => write!(f, "{}={}", self.key, self.value),
            DirectiveMode::Append => write!(f, "--append {}={}", self.key, self.value),
        }
    }
}

/// Ordered directives plus build-macro defines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveSet {
    entries: Vec<Directive>,
    build_defines: Vec<String>,
}

impl DirectiveSet {
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.push(key, value.into(), DirectiveMode::Set);
    }

    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.push(key, value.into(), DirectiveMode::Append);
    }

    fn push(&mut self, key: &str, value: String, mode: DirectiveMode) {
        self.entries.push(Directive {
            key: key.to_string(),
            value,
            mode,
        });
    }

    pub fn define(&mut self, define: &str) {
        if !self.build_defines.iter().any(|d| d == define) {
            self.build_defines.push(define.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Defines injected into the case build macros.
    pub fn build_defines(&self) -> &[String] {
        &self.build_defines
    }

    /// Value of the last `set` directive for `key`.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|d| d.key == key && d.mode == DirectiveMode::Set)
            .map(|d| d.value.as_str())
    }

    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.entries.iter().any(|d| d.key == key && d.value == value)
    }
}

/// Compile the directive set for a resolved scenario.
pub fn compile(scenario: &ResolvedScenario) -> DirectiveSet {
    let descriptor = &scenario.descriptor;
    let modes = scenario.modes;
    let mut set = DirectiveSet::default();

    set.set("SAVE_TIMING", "FALSE");
    set.set("EXEROOT", path_value(&scenario.layout.exe_root));
    set.set("PIO_VERSION", PIO_VERSION.to_string());
    set.set("MOSART_MODE", "NULL");
    set.set("RUNDIR", path_value(&scenario.layout.run_dir));
    set.set("DIN_LOC_ROOT", path_value(&scenario.roots.input_data));
    set.set(
        "DIN_LOC_ROOT_CLMFORC",
        format!("{}/", path_value(&scenario.roots.input_data.join("atm/datm7"))),
    );
    if let Some(site) = scenario.site() {
        set.set("ELM_USRDAT_NAME", format!("1x1pt_{site}"));
    }
    if modes.ad_spinup {
        set.append("ELM_BLDNML_OPTS", "-bgc_spinup on");
    }
    set.set("RUN_STARTDATE", format!("{:04}-01-01", scenario.start_year));
    set.set("DOUT_S", "FALSE");

    if !modes.bypass {
        if scenario.forcing.is_site() {
            set.set("DATM_MODE", "CLM1PT");
            set.set("DATM_CLMNCEP_YR_START", scenario.met.start.to_string());
            set.set("DATM_CLMNCEP_YR_END", scenario.met.end.to_string());
        } else {
            set.set("DATM_MODE", "CLMCRUNCEP");
        }
    }

    if descriptor.timestep_hours != NATIVE_TIMESTEP_HOURS {
        set.set("ATM_NCPL", coupling_steps(descriptor.timestep_hours).to_string());
    }
    if let Some(restart) = &scenario.restart {
        set.set("RUN_REFDATE", restart.ref_date());
    }
    if modes.transient {
        set.set("CCSM_BGC", "CO2A");
        set.set("ELM_CO2_TYPE", "diagnostic");
    }

    for component in COMPONENTS {
        set.set(
            &format!("NTASKS_{component}"),
            descriptor.processors.to_string(),
        );
        set.set(&format!("NTHRDS_{component}"), "1");
    }

    set.set("STOP_OPTION", "nyears");
    set.set("STOP_N", descriptor.run_years.to_string());
    let rest_n = if scenario.is_site() {
        descriptor.run_years
    } else {
        REGION_REST_N
    };
    set.set("REST_N", rest_n.to_string());

    if NETCDF_MACHINE_MARKERS
        .iter()
        .any(|marker| scenario.machine.contains(marker))
    {
        set.set("PIO_TYPENAME", "netcdf");
    }

    let (domain_path, domain_file) = match &descriptor.files.domain {
        Some(domain) => (
            domain.parent().map(path_value).unwrap_or_default(),
            domain
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
        None => ("${RUNDIR}".to_string(), DEFAULT_DOMAIN_FILE.to_string()),
    };
    for prefix in ["ATM", "LND"] {
        set.set(&format!("{prefix}_DOMAIN_PATH"), domain_path.clone());
    }
    for prefix in ["ATM", "LND"] {
        set.set(&format!("{prefix}_DOMAIN_FILE"), domain_file.clone());
    }

    for cppdef in descriptor
        .cppdefs
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
    {
        tracing::info!(cppdef, "enabling CPP modification");
        set.append("ELM_CONFIG_OPTS", format!(" -cppdefs -D{cppdef}"));
    }
    if modes.bypass {
        set.define(BYPASS_DEFINE);
    }
    set
}

/// Coupling intervals per day for a timestep in hours.
///
/// Resolution only admits timesteps that divide a day evenly.
fn coupling_steps(timestep_hours: f64) -> u32 {
    (24.0 / timestep_hours).round() as u32
}

fn path_value(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
#[path = "directives_tests.rs"]
mod tests;
