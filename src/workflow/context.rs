use crate::resolve::{load_site_table, resolve, ForcingTable, ResolveContext, ResolvedScenario};
use crate::settings::{
    default_forcing_table_path, host_name, infer_machine, load_request, validate_request,
    RunRequest,
};
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// A validated request and the scenario it resolves to.
pub struct RunContext {
    pub request: RunRequest,
    pub scenario: ResolvedScenario,
}

impl RunContext {
    pub fn load(request_path: &Path) -> Result<Self> {
        let request = load_request(request_path)?;
        validate_request(&request)?;

        let hostname = host_name();
        let machine = infer_machine(request.machine.as_deref(), hostname.as_deref())
            .ok_or_else(|| {
                anyhow!("machine is not set and cannot be inferred from the host name")
            })?;
        let forcing_table = load_forcing_table(&request)?;
        let site_table = load_site_table(&request.case, &request.roots)?;

        let scenario = resolve(
            &request.case,
            &ResolveContext {
                roots: &request.roots,
                machine: &machine,
                forcing_table: &forcing_table,
                site_table: site_table.as_ref(),
            },
        )
        .with_context(|| format!("resolve {}", request_path.display()))?;
        tracing::info!(
            case = %scenario.layout.name,
            location = scenario.location.label(),
            forcing = %scenario.forcing.kind,
            "scenario resolved"
        );
        Ok(Self { request, scenario })
    }
}

/// An explicit table must exist; the default one is optional.
fn load_forcing_table(request: &RunRequest) -> Result<ForcingTable> {
    if let Some(path) = &request.forcing_table {
        return ForcingTable::load(path)
            .with_context(|| format!("load forcing table {}", path.display()));
    }
    match default_forcing_table_path().filter(|path| path.is_file()) {
        Some(path) => ForcingTable::load(&path)
            .with_context(|| format!("load forcing table {}", path.display())),
        None => Ok(ForcingTable::default()),
    }
}
