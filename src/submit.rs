//! Submission gateway: snapshot the run, call `case.submit`, read the job id.
use crate::error::{CaseError, CaseResult};
use crate::lifecycle::{Phase, RunState};
use crate::settings::CasePaths;
use crate::toolchain::Toolchain;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Slurm prints `Submitted batch job 123`; PBS prints `123.server`.
const JOB_ID_PATTERN: &str = r"^\d+(\.[A-Za-z0-9._-]+)?$";
const SCHEDULER_COMMANDS: [&str; 2] = ["sbatch", "qsub"];
const SYNTHETIC_JOB_ID: &str = "0";

/// Whether a batch scheduler is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    /// Probe `PATH` for `sbatch` or `qsub`.
    #[default]
    Auto,
    Present,
    Absent,
}

impl SchedulerMode {
    pub fn is_available(self) -> bool {
        match self {
            SchedulerMode::Present => true,
            SchedulerMode::Absent => false,
            SchedulerMode::Auto => SCHEDULER_COMMANDS
                .iter()
                .any(|command| which::which(command).is_ok()),
        }
    }
}

/// A submitted job. Synthetic handles (id `0`) stand in when no scheduler ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub synthetic: bool,
    #[serde(default)]
    pub depends_on: Option<String>,
}

/// Arguments for `case.submit`.
///
/// A dependency is passed through verbatim as `--prereq <id>` whenever a
/// scheduler will honor it. Without a scheduler the dependency is dropped:
/// `case.submit` gets no prereq and the synthetic handle records none.
pub fn submission_args(depends_on: Option<&str>, scheduler: bool) -> Vec<String> {
    match depends_on {
        Some(job) if scheduler => vec!["--prereq".to_string(), job.to_string()],
        _ => Vec::new(),
    }
}

/// The job id is the last whitespace-separated token of scheduler stdout.
pub fn parse_job_id(stdout: &str) -> CaseResult<String> {
    let pattern = Regex::new(JOB_ID_PATTERN)
        .map_err(|err| CaseError::precondition(format!("job id pattern: {err}")))?;
    stdout
        .split_whitespace()
        .next_back()
        .filter(|token| pattern.is_match(token))
        .map(str::to_string)
        .ok_or_else(|| CaseError::SubmissionParse {
            output: stdout.to_string(),
        })
}

/// Persist the run state, then submit the case.
pub fn submit(
    state: &mut RunState,
    toolchain: &dyn Toolchain,
    depends_on: Option<&str>,
) -> CaseResult<JobHandle> {
    if state.phase < Phase::Built {
        return Err(CaseError::precondition(format!(
            "submit requires a built case (case is {})",
            state.phase
        )));
    }
    let paths = CasePaths::new(state.scenario.layout.case_dir.clone());
    let state_path = paths.run_state_path();
    state.save(&state_path)?;

    let scheduler = state.options.scheduler.is_available();
    let args = submission_args(depends_on, scheduler);
    let output = toolchain.submit(&paths, &args)?;
    let handle = if scheduler {
        JobHandle {
            id: parse_job_id(&output.stdout)?,
            synthetic: false,
            depends_on: depends_on.map(str::to_string),
        }
    } else {
        JobHandle {
            id: SYNTHETIC_JOB_ID.to_string(),
            synthetic: true,
            depends_on: None,
        }
    };
    tracing::info!(
        case = %state.scenario.layout.name,
        job = %handle.id,
        synthetic = handle.synthetic,
        "case submitted"
    );

    state.submissions.push(handle.clone());
    state.phase = Phase::Submitted;
    state.save(&state_path)?;
    Ok(handle)
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
