//! Run request schema, case-directory layout, and request loading.
//!
//! A run request bundles the four root directories, machine and policy
//! choices, and the case descriptor into one JSON document so a run is fully
//! reproducible from a single file.
/// Current schema version for run request files.
pub const REQUEST_SCHEMA_VERSION: u32 = 1;
/// Current schema version for `run_state.json` snapshots.
pub const RUN_STATE_SCHEMA_VERSION: u32 = 1;
/// Environment variable overriding the provisioning command.
pub const PROVISION_COMMAND_ENV: &str = "ELMCASE_PROVISION_COMMAND";

mod config;
mod paths;
mod types;

pub use config::{
    default_forcing_table_path, host_name, infer_machine, load_request, provision_command, request_stub,
    validate_request, write_request,
};
pub use paths::CasePaths;
pub use types::*;
