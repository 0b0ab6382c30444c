//! CLI argument parsing for the case workflow.
//!
//! The CLI is thin: every command loads a run request (or a case snapshot)
//! and hands off to the library.
use crate::lifecycle::CollisionPolicy;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "elmcase",
    version,
    about = "Configure, build, and submit land-model cases from a run request",
    after_help = "Commands:\n  init --out <file>                Write a run request stub\n  resolve --request <file>         Print the resolved scenario as JSON\n  plan --request <file>            Print directives, namelist overrides, and stream edits\n  run --request <file>             Create, configure, build, and submit the case\n  submit --case-dir <dir>          Resubmit a built case from run_state.json\n\nExamples:\n  elmcase init --out request.json\n  elmcase plan --request request.json\n  elmcase run --request request.json --collision recreate\n  elmcase submit --case-dir /cases/20260101_US-UMB_ICBELMBC --depend 81234",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Resolve(ResolveArgs),
    Plan(PlanArgs),
    Run(RunArgs),
    Submit(SubmitArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Write a run request stub")]
pub struct InitArgs {
    /// Output path for the request JSON
    #[arg(long, value_name = "FILE")]
    pub out: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resolve a run request and print the scenario")]
pub struct ResolveArgs {
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Print the compiled configuration without touching any case")]
pub struct PlanArgs {
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run every lifecycle phase and submit the case")]
pub struct RunArgs {
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Override the request's case-directory collision policy
    #[arg(long, value_enum)]
    pub collision: Option<CollisionArg>,

    /// Job id the submission depends on
    #[arg(long, value_name = "JOB")]
    pub depend: Option<String>,

    /// Stop after the build phase
    #[arg(long)]
    pub no_submit: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Resubmit a built case without re-resolving")]
pub struct SubmitArgs {
    /// Case directory containing run_state.json
    #[arg(long, value_name = "DIR")]
    pub case_dir: PathBuf,

    /// Job id the submission depends on
    #[arg(long, value_name = "JOB")]
    pub depend: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CollisionArg {
    Proceed,
    Recreate,
    Abort,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Proceed => CollisionPolicy::Proceed,
            CollisionArg::Recreate => CollisionPolicy::Recreate,
            CollisionArg::Abort => CollisionPolicy::Abort,
        }
    }
}
