//! Domain, surface, and land-use data for a case.
//!
//! Each file is either supplied by the caller, generated by an external
//! [`DataProvisioner`] into the run directory, or left to the toolchain.
use crate::error::{CaseError, CaseResult};
use crate::namelist::{DOMAIN_FILE, LAND_USE_FILE, SURFACE_FILE};
use crate::resolve::{Location, ResolvedScenario};
use crate::settings::ProvisionSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Domain,
    Surface,
    LandUse,
}

impl DataKind {
    /// File name inside the run directory.
    pub fn run_file(self) -> &'static str {
        match self {
            DataKind::Domain => DOMAIN_FILE,
            DataKind::Surface => SURFACE_FILE,
            DataKind::LandUse => LAND_USE_FILE,
        }
    }

    fn arg(self) -> &'static str {
        match self {
            DataKind::Domain => "domain",
            DataKind::Surface => "surface",
            DataKind::LandUse => "land_use",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.arg())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Supplied,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedFile {
    pub kind: DataKind,
    pub path: PathBuf,
    pub origin: DataOrigin,
}

/// What to do for one data kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStep {
    Supplied(PathBuf),
    Generate(PathBuf),
    /// Neither supplied nor requested.
    Skip,
}

/// Decide, per data kind, how the file is obtained.
///
/// Land use only matters for transient runs that do not suppress it.
pub fn plan_provisioning(
    scenario: &ResolvedScenario,
    settings: &ProvisionSettings,
) -> Vec<(DataKind, ProvisionStep)> {
    let files = &scenario.descriptor.files;
    let mut kinds = vec![
        (DataKind::Domain, files.domain.as_ref(), settings.domain),
        (DataKind::Surface, files.surface.as_ref(), settings.surface),
    ];
    if scenario.modes.transient && !files.suppress_land_use {
        kinds.push((DataKind::LandUse, files.land_use.as_ref(), settings.land_use));
    }
    kinds
        .into_iter()
        .map(|(kind, supplied, requested)| {
            let step = match (supplied, requested) {
                (Some(path), _) => ProvisionStep::Supplied(path.clone()),
                (None, true) => {
                    ProvisionStep::Generate(scenario.layout.run_dir.join(kind.run_file()))
                }
                (None, false) => ProvisionStep::Skip,
            };
            (kind, step)
        })
        .collect()
}

/// One file the provisioner must produce.
pub struct ProvisionJob<'a> {
    pub kind: DataKind,
    pub scenario: &'a ResolvedScenario,
    pub output: &'a Path,
}

/// External generator of domain, surface, and land-use files.
pub trait DataProvisioner {
    fn provision(&self, job: &ProvisionJob<'_>) -> CaseResult<()>;
}

/// Runs a configured generator command once per file.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    argv: Vec<String>,
}

impl CommandProvisioner {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Arguments appended to the configured command for a job.
    pub fn job_args(job: &ProvisionJob<'_>) -> Vec<String> {
        let scenario = job.scenario;
        let mut args = vec![
            "--kind".to_string(),
            job.kind.to_string(),
            "--output".to_string(),
            job.output.display().to_string(),
            "--input-data".to_string(),
            scenario.roots.input_data.display().to_string(),
            "--case-dir".to_string(),
            scenario.layout.case_dir.display().to_string(),
        ];
        match &scenario.location {
            Location::Site { id, group } => {
                args.extend([
                    "--site".to_string(),
                    id.clone(),
                    "--site-group".to_string(),
                    group.clone(),
                ]);
            }
            Location::Region { bounds, .. } => {
                let [lat0, lat1] = bounds.lat_bounds;
                let [lon0, lon1] = bounds.lon_bounds;
                args.extend([
                    "--region".to_string(),
                    format!("{lat0},{lat1},{lon0},{lon1}"),
                ]);
            }
        }
        args
    }
}

impl DataProvisioner for CommandProvisioner {
    fn provision(&self, job: &ProvisionJob<'_>) -> CaseResult<()> {
        let Some((program, base_args)) = self.argv.split_first() else {
            return Err(CaseError::precondition("provision command is empty"));
        };
        let step = format!("provision {}", job.kind);
        let start = Instant::now();
        let output = Command::new(program)
            .args(base_args)
            .args(Self::job_args(job))
            .current_dir(&job.scenario.roots.input_data)
            .output()
            .map_err(|source| CaseError::io("run", program, source))?;
        let elapsed_ms = start.elapsed().as_millis();
        tracing::info!(elapsed_ms, kind = %job.kind, "provision complete");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaseError::Toolchain {
                step,
                detail: format!("status {}: {}", output.status, stderr.trim()),
                log: None,
            });
        }
        if !job.output.is_file() {
            return Err(CaseError::Toolchain {
                step,
                detail: format!("generator did not write {}", job.output.display()),
                log: None,
            });
        }
        Ok(())
    }
}

/// Used when no generator is configured; any generation request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvisioner;

impl DataProvisioner for NoProvisioner {
    fn provision(&self, job: &ProvisionJob<'_>) -> CaseResult<()> {
        Err(CaseError::precondition(format!(
            "{} generation requested but no provision command is configured",
            job.kind
        )))
    }
}
