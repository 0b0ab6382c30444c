//! DATM stream-file rewrites for cases that run the data atmosphere.
//!
//! Planning is pure: [`plan_stream_edits`] turns a resolved scenario into
//! [`FileEdit`]s. [`patch_case_streams`] reads every template before it
//! writes anything, so a missing template leaves the case untouched.
use crate::edit::{FileEdit, Replacement};
use crate::error::{CaseError, CaseResult};
use crate::resolve::ResolvedScenario;
use crate::settings::CasePaths;
use crate::staging::Staging;
use std::fs;
use std::path::PathBuf;

const DATM_NAMELIST: &str = "datm_in";
const DATM_USER_NAMELIST: &str = "user_nl_datm";
const PRESAERO_CLIM_1850: &str = "datm.streams.txt.presaero.clim_1850";
const CO2_TRANSIENT: &str = "datm.streams.txt.co2tseries.20tr";
const POINT_FORCING: &str = "datm.streams.txt.CLM1PT.ELM_USRDAT";
const HISTORICAL_AEROSOL_LINE: &str = "            aerosoldep_monthly_1849-2006_1.9x2.5_c090803.nc";
const TOPO_STREAM: &str = "\"datm.streams.txt.topo.observed 1 1 1\"";
const POINT_DATA_DIR: &str = "CLM1PT_data";

/// Output name for a stream template (`user_` prefix).
fn user_copy(template: &str) -> String {
    format!("user_{template}")
}

/// Plan every stream edit the scenario needs. Bypass cases need none.
pub fn plan_stream_edits(scenario: &ResolvedScenario) -> Vec<FileEdit> {
    if scenario.modes.bypass {
        return Vec::new();
    }
    let mut edits = vec![datm_namelist_edit(scenario)];
    let modes = scenario.modes;

    if scenario.is_site() && !modes.transient && modes.epoch.is_preindustrial() {
        edits.push(
            FileEdit::new(PRESAERO_CLIM_1850, user_copy(PRESAERO_CLIM_1850)).rule(
                "aerosoldep_monthly",
                Replacement::Line(HISTORICAL_AEROSOL_LINE.to_string()),
            ),
        );
    }
    if modes.transient {
        edits.push(
            FileEdit::new(CO2_TRANSIENT, user_copy(CO2_TRANSIENT)).rule(
                ".nc",
                Replacement::Line(format!("      {}", scenario.co2_file.display())),
            ),
        );
    }
    if let (true, Some(site)) = (scenario.forcing.is_site(), scenario.site()) {
        let mut edit = FileEdit::new(POINT_FORCING, user_copy(POINT_FORCING)).rule(
            POINT_DATA_DIR,
            Replacement::Swap {
                first: POINT_DATA_DIR.to_string(),
                second: format!("1x1pt_{site}"),
            },
        );
        if modes.fates {
            edit = edit.rule("FLDS", Replacement::Drop);
        }
        edits.push(edit);
    }
    edits
}

fn datm_namelist_edit(scenario: &ResolvedScenario) -> FileEdit {
    let transient = scenario.modes.transient;
    let mut taxmode = "taxmode = 'cycle', 'extend', 'extend'".to_string();
    if transient {
        taxmode.push_str(", 'extend'");
    }
    FileEdit::new(DATM_NAMELIST, DATM_USER_NAMELIST)
        .rule("streams =", Replacement::Line(stream_list(scenario)))
        .rule("streams", Replacement::Drop)
        .rule("taxmode", Replacement::Line(taxmode))
}

/// The ` streams = ...` declaration. Point or gridded forcing streams follow
/// the forcing kind, then aerosol, CO2 and topography.
fn stream_list(scenario: &ResolvedScenario) -> String {
    let met = &scenario.met;
    let years = format!("{} {} {}", met.align, met.start, met.end);
    let forcing = if scenario.forcing.is_site() {
        vec![format!("\"datm.streams.txt.CLM1PT.ELM_USRDAT {years}  \"")]
    } else {
        ["Solar", "Precip", "TPQW"]
            .iter()
            .map(|stream| format!("\"datm.streams.txt.CLMCRUNCEP.{stream} {years}  \""))
            .collect()
    };

    let mut entries = forcing;
    if scenario.modes.transient {
        entries.push("\"datm.streams.txt.presaero.trans_1850-2000 1850 1850 2000\"".to_string());
        entries.push("\"datm.streams.txt.co2tseries.20tr 1766 1766 2010\"".to_string());
    } else {
        let year = scenario.modes.epoch.year();
        entries.push(format!(
            "\"datm.streams.txt.presaero.clim_{year} 1 {year} {year}\""
        ));
    }
    entries.push(TOPO_STREAM.to_string());
    format!(" streams = {}", entries.join(", "))
}

/// Apply the planned stream edits to the case's DATM templates.
///
/// Returns the files written, or an empty list for bypass cases.
pub fn patch_case_streams(
    scenario: &ResolvedScenario,
    paths: &CasePaths,
) -> CaseResult<Vec<PathBuf>> {
    let edits = plan_stream_edits(scenario);
    if edits.is_empty() {
        return Ok(Vec::new());
    }
    let template_dir = paths.datm_conf_dir();
    let mut sources = Vec::with_capacity(edits.len());
    for edit in &edits {
        let path = template_dir.join(&edit.template);
        if !path.is_file() {
            return Err(CaseError::precondition(format!(
                "stream template {} is missing; no stream files were written",
                path.display()
            )));
        }
        let text = fs::read_to_string(&path).map_err(|source| CaseError::io("read", &path, source))?;
        sources.push(text);
    }

    let staging = Staging::new()?;
    for (edit, text) in edits.iter().zip(&sources) {
        staging.write_text(&edit.output, &edit.apply(text))?;
    }
    let written = staging.publish(paths.root())?;
    tracing::info!(
        case = %scenario.layout.name,
        files = written.len(),
        "stream files patched"
    );
    Ok(written)
}

#[cfg(test)]
#[path = "streams_tests.rs"]
mod tests;
