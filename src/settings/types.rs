//! Serde types for run request files.
use crate::case::CaseDescriptor;
use crate::lifecycle::CollisionPolicy;
use crate::submit::SchedulerMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One run request: roots, machine, policies, and the case descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRequest {
    pub schema_version: u32,
    pub roots: RootDirs,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
    /// `name:path` forcing-family table; defaults under the user config dir.
    #[serde(default)]
    pub forcing_table: Option<PathBuf>,
    #[serde(default)]
    pub collision: CollisionPolicy,
    #[serde(default)]
    pub scheduler: SchedulerMode,
    #[serde(default)]
    pub provision: ProvisionSettings,
    #[serde(default)]
    pub build: BuildSettings,
    pub case: CaseDescriptor,
}

/// Root directories a run reads from and writes into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootDirs {
    /// Model source checkout containing `cime/`.
    pub model: PathBuf,
    pub input_data: PathBuf,
    pub run: PathBuf,
    pub case: PathBuf,
    /// Prebuilt executable root; when set the build step is skipped.
    #[serde(default)]
    pub exe: Option<PathBuf>,
}

impl RootDirs {
    /// The roots that must exist before a case is created, with labels.
    pub fn required(&self) -> [(&'static str, &PathBuf); 4] {
        [
            ("model root", &self.model),
            ("input data directory", &self.input_data),
            ("run root", &self.run),
            ("case root", &self.case),
        ]
    }
}

/// Which domain/surface/land-use files to generate when not supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionSettings {
    pub domain: bool,
    pub surface: bool,
    pub land_use: bool,
    /// Generator command line, split with shell quoting rules.
    pub command: Option<String>,
}

impl ProvisionSettings {
    pub fn any_requested(&self) -> bool {
        self.domain || self.surface || self.land_use
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Run `case.build --clean-all` before building.
    pub clean: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self { clean: true }
    }
}
