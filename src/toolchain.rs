//! External CIME toolchain.
//!
//! [`Toolchain`] is the seam the lifecycle drives. [`CimeToolchain`] runs the
//! real scripts with absolute program paths and an explicit working
//! directory per invocation.
use crate::directives::Directive;
use crate::error::{CaseError, CaseResult};
use crate::settings::CasePaths;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

const WALLTIME: &str = "2:0:00";
const MPILIB: &str = "mpi-serial";

/// Arguments for `create_newcase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCase<'a> {
    pub case_dir: &'a Path,
    pub machine: &'a str,
    pub compset: &'a str,
    pub resolution: &'a str,
    pub project: Option<&'a str>,
    pub compiler: Option<&'a str>,
}

impl NewCase<'_> {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--case".to_string(),
            self.case_dir.display().to_string(),
            "--mach".to_string(),
            self.machine.to_string(),
            "--compset".to_string(),
            self.compset.to_string(),
            "--res".to_string(),
            self.resolution.to_string(),
            "--walltime".to_string(),
            WALLTIME.to_string(),
            "--handle-preexisting-dirs".to_string(),
            "u".to_string(),
        ];
        if let Some(project) = self.project.filter(|p| !p.is_empty()) {
            args.extend(["--project".to_string(), project.to_string()]);
        }
        if let Some(compiler) = self.compiler.filter(|c| !c.is_empty()) {
            args.extend(["--compiler".to_string(), compiler.to_string()]);
        }
        args.extend(["--mpilib".to_string(), MPILIB.to_string()]);
        args
    }
}

/// Captured stdout/stderr of a finished step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Operations the lifecycle needs from the build-and-run toolchain.
pub trait Toolchain {
    fn create_case(&self, request: &NewCase<'_>) -> CaseResult<()>;
    fn xmlchange(&self, case: &CasePaths, directive: &Directive) -> CaseResult<()>;
    fn setup(&self, case: &CasePaths) -> CaseResult<()>;
    fn build(&self, case: &CasePaths, clean: bool) -> CaseResult<()>;
    fn preview_namelists(&self, case: &CasePaths) -> CaseResult<()>;
    /// Run `case.submit` with the given arguments.
    fn submit(&self, case: &CasePaths, args: &[String]) -> CaseResult<StepOutput>;
}

/// Process-backed toolchain rooted at a model source tree.
#[derive(Debug, Clone)]
pub struct CimeToolchain {
    model_root: PathBuf,
}

impl CimeToolchain {
    pub fn new(model_root: PathBuf) -> Self {
        Self { model_root }
    }

    fn scripts_dir(&self) -> PathBuf {
        self.model_root.join("cime").join("scripts")
    }

    fn preview_namelists_path(&self) -> PathBuf {
        let legacy = self
            .scripts_dir()
            .join("Tools")
            .join("preview_namelists");
        if legacy.is_file() {
            return legacy;
        }
        self.model_root
            .join("cime")
            .join("CIME")
            .join("Tools")
            .join("preview_namelists")
    }
}

impl Toolchain for CimeToolchain {
    fn create_case(&self, request: &NewCase<'_>) -> CaseResult<()> {
        let scripts = self.scripts_dir();
        let mut command = Command::new(scripts.join("create_newcase"));
        command.args(request.args()).current_dir(&scripts);
        let output = run_step("create_newcase", &mut command)?;

        let case_log = request.case_dir.join("create_newcase.log");
        let log = if request.case_dir.is_dir() {
            case_log
        } else {
            sibling_log(request.case_dir, "create_newcase.log")
        };
        write_log(&log, &output)?;
        if !output.status.success() || !request.case_dir.is_dir() {
            return Err(CaseError::Toolchain {
                step: "create_newcase".to_string(),
                detail: failure_detail(&output),
                log: Some(log),
            });
        }
        Ok(())
    }

    fn xmlchange(&self, case: &CasePaths, directive: &Directive) -> CaseResult<()> {
        let mut command = Command::new(case.script("xmlchange"));
        command.args(directive.xmlchange_args()).current_dir(case.root());
        let output = run_step("xmlchange", &mut command)?;
        if !output.status.success() {
            return Err(CaseError::Toolchain {
                step: format!("xmlchange {}", directive.key),
                detail: failure_detail(&output),
                log: None,
            });
        }
        Ok(())
    }

    fn setup(&self, case: &CasePaths) -> CaseResult<()> {
        let mut command = Command::new(case.script("case.setup"));
        command.current_dir(case.root());
        run_logged("case.setup", &mut command, &case.log("case_setup.log"))
    }

    fn build(&self, case: &CasePaths, clean: bool) -> CaseResult<()> {
        let log = case.log("case_build.log");
        if clean {
            let mut command = Command::new(case.script("case.build"));
            command.arg("--clean-all").current_dir(case.root());
            run_logged("case.build --clean-all", &mut command, &log)?;
        }
        let mut command = Command::new(case.script("case.build"));
        command.current_dir(case.root());
        run_logged("case.build", &mut command, &log)
    }

    fn preview_namelists(&self, case: &CasePaths) -> CaseResult<()> {
        let mut command = Command::new(self.preview_namelists_path());
        command.current_dir(case.root());
        let output = run_step("preview_namelists", &mut command)?;
        if !output.status.success() {
            return Err(CaseError::Toolchain {
                step: "preview_namelists".to_string(),
                detail: failure_detail(&output),
                log: None,
            });
        }
        Ok(())
    }

    fn submit(&self, case: &CasePaths, args: &[String]) -> CaseResult<StepOutput> {
        let mut command = Command::new(case.script("case.submit"));
        command.args(args).current_dir(case.root());
        let output = run_step("case.submit", &mut command)?;
        let captured = StepOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !output.status.success() {
            return Err(CaseError::Toolchain {
                step: "case.submit".to_string(),
                detail: format!(
                    "status {}\nstdout:\n{}\nstderr:\n{}",
                    output.status,
                    captured.stdout.trim(),
                    captured.stderr.trim()
                ),
                log: None,
            });
        }
        Ok(captured)
    }
}

fn run_step(step: &str, command: &mut Command) -> CaseResult<Output> {
    let program = PathBuf::from(command.get_program());
    let start = Instant::now();
    let output = command
        .output()
        .map_err(|source| CaseError::io("run", program, source))?;
    let elapsed_ms = start.elapsed().as_millis();
    tracing::info!(
        elapsed_ms,
        step,
        success = output.status.success(),
        stdout_bytes = output.stdout.len(),
        "toolchain step complete"
    );
    Ok(output)
}

fn run_logged(step: &str, command: &mut Command, log: &Path) -> CaseResult<()> {
    let output = run_step(step, command)?;
    write_log(log, &output)?;
    if !output.status.success() {
        return Err(CaseError::Toolchain {
            step: step.to_string(),
            detail: failure_detail(&output),
            log: Some(log.to_path_buf()),
        });
    }
    Ok(())
}

fn write_log(path: &Path, output: &Output) -> CaseResult<()> {
    let mut bytes = output.stdout.clone();
    bytes.extend_from_slice(&output.stderr);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CaseError::io("create", parent, source))?;
    }
    fs::write(path, bytes).map_err(|source| CaseError::io("write", path, source))
}

fn sibling_log(case_dir: &Path, name: &str) -> PathBuf {
    let stem = case_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    case_dir.with_file_name(format!("{stem}.{name}"))
}

fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.trim().lines().next().unwrap_or_default().to_string();
    if line.is_empty() {
        format!("status {}", output.status)
    } else {
        line
    }
}
