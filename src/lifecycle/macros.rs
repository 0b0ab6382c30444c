//! Build-macro injection for coupler-bypass cases.
use crate::edit::{FileEdit, Replacement};
use crate::error::{CaseError, CaseResult};
use crate::settings::CasePaths;
use crate::staging::Staging;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Line edits applied to `Macros.make` / `Macros.cmake`.
pub fn macro_edit(file_name: &str, defines: &[String]) -> FileEdit {
    FileEdit::new(file_name, file_name)
        .rule(
            "CPPDEFS",
            Replacement::AppendSuffix(format!(" {}", defines.join(" "))),
        )
        .rule(
            "llapack",
            Replacement::Substitute {
                from: "llapack".to_string(),
                to: "llapack -lgfortran".to_string(),
            },
        )
        .rule(
            "mcmodel=medium",
            Replacement::Substitute {
                from: "mcmodel=medium".to_string(),
                to: "mcmodel=small".to_string(),
            },
        )
}

/// Inject `defines` into whichever macro files the case has.
///
/// Returns the files touched. Does nothing without defines.
pub fn inject_build_defines(paths: &CasePaths, defines: &[String]) -> CaseResult<Vec<PathBuf>> {
    if defines.is_empty() {
        return Ok(Vec::new());
    }
    let staging = Staging::new()?;
    for path in paths.macro_files() {
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let text = fs::read_to_string(&path).map_err(|source| CaseError::io("read", &path, source))?;
        staging.write_text(name, &macro_edit(name, defines).apply(&text))?;
    }
    let mut touched = staging.publish(paths.root())?;

    let universal = paths.universal_cmake();
    if universal.is_file() {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&universal)
            .map_err(|source| CaseError::io("open", &universal, source))?;
        for define in defines {
            writeln!(file, "string(APPEND CPPDEFS \" {define}\")")
                .map_err(|source| CaseError::io("write", &universal, source))?;
        }
        touched.push(universal);
    }
    tracing::info!(files = touched.len(), defines = ?defines, "build macros patched");
    Ok(touched)
}
