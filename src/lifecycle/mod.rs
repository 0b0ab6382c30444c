//! Case lifecycle: strictly ordered phases over an external toolchain.
//!
//! `Created → DirectoryProvisioned → DomainProvisioned →
//! ConfigurationCompiled → Built → Submitted`. Each phase checks that the
//! previous one completed and that its own preconditions hold before it
//! touches the case directory.
use crate::directives::{compile, Directive};
use crate::error::{CaseError, CaseResult};
use crate::namelist::{
    accumulate, namelist_value, HistoryVarSelector, DEMOGRAPHY_PARAMS_FILE, NUTRIENT_PARAMS_FILE,
    PRIMARY_PARAMS_FILE,
};
use crate::resolve::ResolvedScenario;
use crate::settings::CasePaths;
use crate::streams::patch_case_streams;
use crate::submit::{self, JobHandle};
use crate::toolchain::{NewCase, Toolchain};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

mod macros;
pub mod provision;
mod state;

pub use macros::{inject_build_defines, macro_edit};
pub use provision::{
    plan_provisioning, CommandProvisioner, DataKind, DataOrigin, DataProvisioner, NoProvisioner,
    ProvisionJob, ProvisionStep, ProvisionedFile,
};
pub use state::{Phase, RunOptions, RunState, StagedParameter};

/// What to do when the case directory already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Reuse the existing directory.
    Proceed,
    /// Remove it and create the case again.
    Recreate,
    #[default]
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionAction {
    Create,
    Reuse,
    RemoveThenCreate,
    Abort,
}

/// Decide how to treat the case directory. No I/O.
pub fn decide_collision(exists: bool, policy: CollisionPolicy) -> CollisionAction {
    match (exists, policy) {
        (false, _) => CollisionAction::Create,
        (true, CollisionPolicy::Proceed) => CollisionAction::Reuse,
        (true, CollisionPolicy::Recreate) => CollisionAction::RemoveThenCreate,
        (true, CollisionPolicy::Abort) => CollisionAction::Abort,
    }
}

/// External collaborators the controller drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub toolchain: &'a dyn Toolchain,
    pub provisioner: &'a dyn DataProvisioner,
    pub history: &'a dyn HistoryVarSelector,
}

pub struct LifecycleController<'a> {
    tools: Collaborators<'a>,
    state: RunState,
    paths: CasePaths,
}

impl<'a> LifecycleController<'a> {
    pub fn new(scenario: ResolvedScenario, options: RunOptions, tools: Collaborators<'a>) -> Self {
        Self::resume(RunState::new(scenario, options), tools)
    }

    /// Continue from a saved state.
    pub fn resume(state: RunState, tools: Collaborators<'a>) -> Self {
        let paths = CasePaths::new(state.scenario.layout.case_dir.clone());
        Self {
            tools,
            state,
            paths,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    fn scenario(&self) -> &ResolvedScenario {
        &self.state.scenario
    }

    fn require(&self, expected: Phase, action: &str) -> CaseResult<()> {
        if self.state.phase != expected {
            return Err(CaseError::precondition(format!(
                "{action} requires phase '{expected}', case is '{}'",
                self.state.phase
            )));
        }
        Ok(())
    }

    fn advance(&mut self, phase: Phase) {
        tracing::info!(case = %self.scenario().layout.name, %phase, "phase complete");
        self.state.phase = phase;
    }

    /// Check roots, apply the collision policy, and create the case.
    pub fn provision_directories(&mut self, policy: CollisionPolicy) -> CaseResult<()> {
        self.require(Phase::Created, "directory provisioning")?;
        for (label, path) in self.scenario().roots.required() {
            if !path.is_dir() {
                return Err(CaseError::precondition(format!(
                    "{label} {} does not exist",
                    path.display()
                )));
            }
        }

        let case_dir = self.scenario().layout.case_dir.clone();
        match decide_collision(case_dir.exists(), policy) {
            CollisionAction::Abort => {
                return Err(CaseError::precondition(format!(
                    "case directory {} already exists (collision policy: abort)",
                    case_dir.display()
                )));
            }
            CollisionAction::RemoveThenCreate => {
                tracing::warn!(path = %case_dir.display(), "removing existing case directory");
                fs::remove_dir_all(&case_dir)
                    .map_err(|source| CaseError::io("remove", &case_dir, source))?;
            }
            CollisionAction::Reuse => {
                tracing::warn!(path = %case_dir.display(), "proceeding into existing case directory");
            }
            CollisionAction::Create => {}
        }

        let scenario = self.scenario();
        let options = &self.state.options;
        self.tools.toolchain.create_case(&NewCase {
            case_dir: &case_dir,
            machine: &scenario.machine,
            compset: &scenario.descriptor.compset,
            resolution: &scenario.resolution,
            project: options.project.as_deref(),
            compiler: options.compiler.as_deref(),
        })?;
        if !case_dir.is_dir() {
            return Err(CaseError::Toolchain {
                step: "create_newcase".to_string(),
                detail: format!("case directory {} was not created", case_dir.display()),
                log: None,
            });
        }
        self.advance(Phase::DirectoryProvisioned);
        Ok(())
    }

    /// Accept supplied data files and generate requested ones.
    pub fn provision_domain(&mut self) -> CaseResult<()> {
        self.require(Phase::DirectoryProvisioned, "domain provisioning")?;
        let steps = plan_provisioning(self.scenario(), &self.state.options.provision);
        let mut provisioned = Vec::new();
        for (kind, step) in steps {
            match step {
                ProvisionStep::Supplied(path) => {
                    tracing::info!(%kind, path = %path.display(), "using supplied file");
                    provisioned.push(ProvisionedFile {
                        kind,
                        path,
                        origin: DataOrigin::Supplied,
                    });
                }
                ProvisionStep::Generate(path) => {
                    ensure_dir(&self.scenario().layout.run_dir)?;
                    self.tools.provisioner.provision(&ProvisionJob {
                        kind,
                        scenario: self.scenario(),
                        output: &path,
                    })?;
                    tracing::info!(%kind, path = %path.display(), "generated file");
                    provisioned.push(ProvisionedFile {
                        kind,
                        path,
                        origin: DataOrigin::Generated,
                    });
                }
                ProvisionStep::Skip => {
                    tracing::debug!(%kind, "not supplied or requested; run directory default expected");
                }
            }
        }
        self.state.provisioned = provisioned;
        self.advance(Phase::DomainProvisioned);
        Ok(())
    }

    /// Apply directives, set up the case, and write namelist overrides.
    pub fn compile_configuration(&mut self) -> CaseResult<()> {
        self.require(Phase::DomainProvisioned, "configuration")?;
        let descriptor = &self.scenario().descriptor;
        if let Some(srcmods) = &descriptor.srcmods {
            if !srcmods.is_dir() {
                return Err(CaseError::precondition(format!(
                    "source mods directory {} does not exist",
                    srcmods.display()
                )));
            }
        }
        if let Some(extra) = &descriptor.extra_namelist {
            if !extra.is_file() {
                return Err(CaseError::precondition(format!(
                    "extra namelist file {} does not exist",
                    extra.display()
                )));
            }
        }

        let directives = compile(self.scenario());
        for directive in directives.iter() {
            self.tools.toolchain.xmlchange(&self.paths, directive)?;
        }
        tracing::info!(count = directives.len(), "directives applied");
        self.tools.toolchain.setup(&self.paths)?;

        self.state.parameters = self.parameter_sources()?;

        let overrides =
            accumulate(self.scenario(), &directives, self.tools.history).deduplicated();
        let mut text = overrides.render();
        if let Some(extra) = &self.scenario().descriptor.extra_namelist {
            let extra_text = fs::read_to_string(extra)
                .map_err(|source| CaseError::io("read", extra, source))?;
            text.push_str(&extra_text);
        }
        append_text(&self.paths.user_nl_elm(), &text)?;
        tracing::info!(entries = overrides.len(), "namelist overrides appended");

        inject_build_defines(&self.paths, directives.build_defines())?;
        if let Some(srcmods) = &self.scenario().descriptor.srcmods {
            copy_dir_contents(srcmods, &self.paths.source_mods())?;
        }

        self.state.directives = directives;
        self.state.namelist = overrides;
        self.advance(Phase::ConfigurationCompiled);
        Ok(())
    }

    /// Parameter files to stage: explicit paths or the case defaults.
    fn parameter_sources(&self) -> CaseResult<Vec<StagedParameter>> {
        let scenario = self.scenario();
        let parameters = &scenario.descriptor.parameters;
        let mut wanted = vec![
            ("paramfile", parameters.primary.as_ref(), PRIMARY_PARAMS_FILE),
            ("fsoilordercon", parameters.nutrient.as_ref(), NUTRIENT_PARAMS_FILE),
        ];
        if scenario.modes.fates {
            wanted.push((
                "fates_paramfile",
                parameters.demography.as_ref(),
                DEMOGRAPHY_PARAMS_FILE,
            ));
        }

        let lnd_in = self.paths.lnd_in();
        let mut defaults: Option<String> = None;
        let mut staged = Vec::with_capacity(wanted.len());
        for (key, explicit, file) in wanted {
            let source = match explicit {
                Some(path) => path.clone(),
                None => {
                    if defaults.is_none() {
                        let text = fs::read_to_string(&lnd_in)
                            .map_err(|source| CaseError::io("read", &lnd_in, source))?;
                        defaults = Some(text);
                    }
                    let text = defaults.as_deref().unwrap_or_default();
                    namelist_value(text, key).map(PathBuf::from).ok_or_else(|| {
                        CaseError::precondition(format!(
                            "{} has no default for {key}",
                            lnd_in.display()
                        ))
                    })?
                }
            };
            staged.push(StagedParameter {
                source,
                dest: scenario.layout.run_dir.join(file),
            });
        }
        Ok(staged)
    }

    /// Build (or mark prebuilt), patch streams, and stage parameter files.
    pub fn build(&mut self) -> CaseResult<()> {
        self.require(Phase::ConfigurationCompiled, "build")?;
        let scenario = self.scenario();
        if scenario.layout.build_required {
            self.tools
                .toolchain
                .build(&self.paths, self.state.options.clean_build)?;
        } else {
            tracing::info!(exe_root = %scenario.layout.exe_root.display(), "using prebuilt executable");
            self.tools
                .toolchain
                .xmlchange(&self.paths, &Directive::set("BUILD_COMPLETE", "TRUE"))?;
        }

        let patched = patch_case_streams(scenario, &self.paths)?;
        if !patched.is_empty() {
            self.tools.toolchain.preview_namelists(&self.paths)?;
        }

        ensure_dir(&scenario.layout.run_dir)?;
        for parameter in &self.state.parameters {
            fs::copy(&parameter.source, &parameter.dest)
                .map_err(|source| CaseError::io("stage", &parameter.source, source))?;
        }
        tracing::info!(count = self.state.parameters.len(), "parameter files staged");
        self.advance(Phase::Built);
        Ok(())
    }

    /// Submit the built case, optionally after `depends_on`.
    pub fn submit(&mut self, depends_on: Option<&str>) -> CaseResult<JobHandle> {
        if self.state.phase < Phase::Built {
            return Err(CaseError::precondition(format!(
                "submit requires phase '{}', case is '{}'",
                Phase::Built,
                self.state.phase
            )));
        }
        submit::submit(&mut self.state, self.tools.toolchain, depends_on)
    }

    /// Run every phase up to and including the build.
    pub fn run_to_build(&mut self, policy: CollisionPolicy) -> CaseResult<()> {
        self.provision_directories(policy)?;
        self.provision_domain()?;
        self.compile_configuration()?;
        self.build()
    }
}

fn ensure_dir(path: &Path) -> CaseResult<()> {
    fs::create_dir_all(path).map_err(|source| CaseError::io("create", path, source))
}

fn append_text(path: &Path, text: &str) -> CaseResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CaseError::io("open", path, source))?;
    file.write_all(text.as_bytes())
        .map_err(|source| CaseError::io("write", path, source))
}

fn copy_dir_contents(from: &Path, to: &Path) -> CaseResult<()> {
    ensure_dir(to)?;
    let entries = fs::read_dir(from).map_err(|source| CaseError::io("read", from, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| CaseError::io("read", from, source))?;
        let source_path = entry.path();
        let dest = to.join(entry.file_name());
        if source_path.is_dir() {
            copy_dir_contents(&source_path, &dest)?;
        } else {
            fs::copy(&source_path, &dest)
                .map_err(|source| CaseError::io("copy", &source_path, source))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
