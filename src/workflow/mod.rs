//! Workflow steps behind each CLI command.
//!
//! Each step loads its inputs, calls into the library, and prints results.
mod context;
mod init;
mod plan;
mod run;

pub use context::RunContext;
pub use init::run_init;
pub use plan::{build_plan, run_plan, run_resolve, CasePlan};
pub use run::{run_run, run_submit};
