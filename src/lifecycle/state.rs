//! Run state: the phase reached plus everything compiled so far.
//!
//! The snapshot is written to `run_state.json` in the case directory before
//! each submission, so a case can be resubmitted without re-resolving.
use super::provision::ProvisionedFile;
use crate::directives::DirectiveSet;
use crate::error::{CaseError, CaseResult};
use crate::namelist::NamelistOverrideSet;
use crate::resolve::ResolvedScenario;
use crate::settings::{ProvisionSettings, RunRequest, RUN_STATE_SCHEMA_VERSION};
use crate::submit::{JobHandle, SchedulerMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Lifecycle phases in the only order they may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    DirectoryProvisioned,
    DomainProvisioned,
    ConfigurationCompiled,
    Built,
    Submitted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Created => "created",
            Phase::DirectoryProvisioned => "directory provisioned",
            Phase::DomainProvisioned => "domain provisioned",
            Phase::ConfigurationCompiled => "configuration compiled",
            Phase::Built => "built",
            Phase::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

/// Request settings the phases after resolution still need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    pub project: Option<String>,
    pub compiler: Option<String>,
    pub clean_build: bool,
    pub scheduler: SchedulerMode,
    pub provision: ProvisionSettings,
}

impl RunOptions {
    pub fn from_request(request: &RunRequest) -> Self {
        Self {
            project: request.project.clone(),
            compiler: request.compiler.clone(),
            clean_build: request.build.clean,
            scheduler: request.scheduler,
            provision: request.provision.clone(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            project: None,
            compiler: None,
            clean_build: true,
            scheduler: SchedulerMode::default(),
            provision: ProvisionSettings::default(),
        }
    }
}

/// A parameter file copied into the run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedParameter {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub schema_version: u32,
    pub phase: Phase,
    pub options: RunOptions,
    pub scenario: ResolvedScenario,
    #[serde(default)]
    pub directives: DirectiveSet,
    #[serde(default)]
    pub namelist: NamelistOverrideSet,
    #[serde(default)]
    pub provisioned: Vec<ProvisionedFile>,
    #[serde(default)]
    pub parameters: Vec<StagedParameter>,
    #[serde(default)]
    pub submissions: Vec<JobHandle>,
}

impl RunState {
    pub fn new(scenario: ResolvedScenario, options: RunOptions) -> Self {
        Self {
            schema_version: RUN_STATE_SCHEMA_VERSION,
            phase: Phase::Created,
            options,
            scenario,
            directives: DirectiveSet::default(),
            namelist: NamelistOverrideSet::default(),
            provisioned: Vec::new(),
            parameters: Vec::new(),
            submissions: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> CaseResult<Self> {
        if !path.is_file() {
            return Err(CaseError::precondition(format!(
                "no run state at {}; run the case before resubmitting",
                path.display()
            )));
        }
        let bytes = fs::read(path).map_err(|source| CaseError::io("read", path, source))?;
        let state: RunState = serde_json::from_slice(&bytes).map_err(|err| {
            CaseError::precondition(format!("parse run state {}: {err}", path.display()))
        })?;
        if state.schema_version != RUN_STATE_SCHEMA_VERSION {
            return Err(CaseError::precondition(format!(
                "unsupported run state schema_version {} (expected {RUN_STATE_SCHEMA_VERSION})",
                state.schema_version
            )));
        }
        Ok(state)
    }

    /// Write the snapshot atomically.
    pub fn save(&self, path: &Path) -> CaseResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| CaseError::precondition("run state path has no parent"))?;
        let text = serde_json::to_string_pretty(self).map_err(|err| {
            CaseError::io("serialize", path, std::io::Error::other(err))
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|source| CaseError::io("create", dir, source))?;
        tmp.write_all(text.as_bytes())
            .map_err(|source| CaseError::io("write", path, source))?;
        tmp.persist(path)
            .map_err(|err| CaseError::io("write", path, err.error))?;
        Ok(())
    }
}
