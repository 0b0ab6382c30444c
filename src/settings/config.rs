//! Run request helpers.
//!
//! This module loads, validates, and normalizes run requests so the rest of
//! the workflow can assume absolute roots and a supported schema.
use super::{
    BuildSettings, ProvisionSettings, RootDirs, RunRequest, PROVISION_COMMAND_ENV,
    REQUEST_SCHEMA_VERSION,
};
use crate::case::CaseDescriptor;
use crate::lifecycle::CollisionPolicy;
use crate::submit::SchedulerMode;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const BASELINE_HOST_MARKER: &str = "baseline";
const BASELINE_MACHINE: &str = "cades-baseline";
const KERNEL_HOSTNAME_PATH: &str = "/proc/sys/kernel/hostname";

/// Load a run request from JSON.
pub fn load_request(path: &Path) -> Result<RunRequest> {
    let bytes = fs::read(path).with_context(|| format!("read request {}", path.display()))?;
    let request: RunRequest = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse run request {}", path.display()))?;
    Ok(request)
}

/// Persist a request in a stable JSON format.
pub fn write_request(path: &Path, request: &RunRequest) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(request).context("serialize run request")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Validate schema version, root paths, and provisioning settings.
pub fn validate_request(request: &RunRequest) -> Result<()> {
    if request.schema_version != REQUEST_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported run request schema_version {} (expected {})",
            request.schema_version,
            REQUEST_SCHEMA_VERSION
        ));
    }
    for (label, path) in request.roots.required() {
        validate_absolute(path, label)?;
    }
    if let Some(exe) = &request.roots.exe {
        validate_absolute(exe, "exe root")?;
    }
    if request.provision.any_requested() && provision_command(&request.provision)?.is_none() {
        return Err(anyhow!(
            "provision requested but no command configured (set provision.command or {PROVISION_COMMAND_ENV})"
        ));
    }
    Ok(())
}

fn validate_absolute(path: &Path, label: &str) -> Result<()> {
    if !path.is_absolute() {
        return Err(anyhow!(
            "{label} must be an absolute path (got {})",
            path.display()
        ));
    }
    Ok(())
}

/// Pick the machine name: explicit first, then the host name marker.
pub fn infer_machine(explicit: Option<&str>, hostname: Option<&str>) -> Option<String> {
    if let Some(machine) = explicit.map(str::trim).filter(|m| !m.is_empty()) {
        return Some(machine.to_string());
    }
    hostname
        .filter(|host| host.contains(BASELINE_HOST_MARKER))
        .map(|_| BASELINE_MACHINE.to_string())
}

/// The host name as the kernel reports it, else the `HOSTNAME` variable.
pub fn host_name() -> Option<String> {
    pick_host_name(
        fs::read_to_string(KERNEL_HOSTNAME_PATH).ok(),
        std::env::var("HOSTNAME").ok(),
    )
}

fn pick_host_name(kernel: Option<String>, env: Option<String>) -> Option<String> {
    [kernel, env]
        .into_iter()
        .flatten()
        .map(|host| host.trim().to_string())
        .find(|host| !host.is_empty())
}

/// Resolve the generator argv, preferring the environment override.
pub fn provision_command(settings: &ProvisionSettings) -> Result<Option<Vec<String>>> {
    let raw = std::env::var(PROVISION_COMMAND_ENV)
        .ok()
        .or_else(|| settings.command.clone());
    let Some(raw) = raw else {
        return Ok(None);
    };
    let args =
        shell_words::split(&raw).with_context(|| format!("parse provision command: {raw}"))?;
    if args.is_empty() {
        return Err(anyhow!("provision command is empty"));
    }
    Ok(Some(args))
}

/// Default location of the forcing-family table under the user config dir.
pub fn default_forcing_table_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("elm-case").join("metinfo.txt"))
}

/// Render a pretty JSON request stub for new runs.
pub fn request_stub(root: &Path) -> Result<String> {
    let request = RunRequest {
        schema_version: REQUEST_SCHEMA_VERSION,
        roots: RootDirs {
            model: root.join("E3SM"),
            input_data: root.join("inputdata"),
            run: root.join("runs"),
            case: root.join("cases"),
            exe: None,
        },
        machine: None,
        project: None,
        compiler: None,
        forcing_table: default_forcing_table_path(),
        collision: CollisionPolicy::Abort,
        scheduler: SchedulerMode::Auto,
        provision: ProvisionSettings::default(),
        build: BuildSettings::default(),
        case: CaseDescriptor {
            site: Some("US-UMB".to_string()),
            ..CaseDescriptor::default()
        },
    };
    serde_json::to_string_pretty(&request).context("serialize request stub")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
