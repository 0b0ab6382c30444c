use anyhow::Result;
use clap::Parser;
use elm_case::cli::{Command, RootArgs};
use elm_case::workflow;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Init(args) => workflow::run_init(args),
        Command::Resolve(args) => workflow::run_resolve(args),
        Command::Plan(args) => workflow::run_plan(args),
        Command::Run(args) => workflow::run_run(args),
        Command::Submit(args) => workflow::run_submit(args),
    }
}
