//! Resolve and plan steps: print what a run would do without touching a case.
use super::RunContext;
use crate::cli::{PlanArgs, ResolveArgs};
use crate::directives::compile;
use crate::edit::FileEdit;
use crate::lifecycle::{plan_provisioning, ProvisionStep};
use crate::namelist::{accumulate, AnnualSpinupHistory};
use crate::resolve::ResolvedScenario;
use crate::settings::ProvisionSettings;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Everything the configuration phases would apply to a case.
#[derive(Debug, Clone, Serialize)]
pub struct CasePlan {
    pub case_name: String,
    pub case_dir: PathBuf,
    pub run_dir: PathBuf,
    pub resolution: String,
    pub directives: Vec<String>,
    pub build_defines: Vec<String>,
    pub namelist: Vec<String>,
    pub stream_edits: Vec<FileEdit>,
    pub provisioning: Vec<PlannedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub kind: String,
    pub action: &'static str,
    pub path: Option<PathBuf>,
}

/// Compile directives, namelist overrides, and stream edits for a scenario.
pub fn build_plan(scenario: &ResolvedScenario, provision: &ProvisionSettings) -> CasePlan {
    let directives = compile(scenario);
    let namelist = accumulate(scenario, &directives, &AnnualSpinupHistory).deduplicated();
    let provisioning = plan_provisioning(scenario, provision)
        .into_iter()
        .map(|(kind, step)| {
            let (action, path) = match step {
                ProvisionStep::Supplied(path) => ("supplied", Some(path)),
                ProvisionStep::Generate(path) => ("generate", Some(path)),
                ProvisionStep::Skip => ("skip", None),
            };
            PlannedFile {
                kind: kind.to_string(),
                action,
                path,
            }
        })
        .collect();
    CasePlan {
        case_name: scenario.layout.name.clone(),
        case_dir: scenario.layout.case_dir.clone(),
        run_dir: scenario.layout.run_dir.clone(),
        resolution: scenario.resolution.clone(),
        directives: directives.iter().map(ToString::to_string).collect(),
        build_defines: directives.build_defines().to_vec(),
        namelist: namelist.iter().map(ToString::to_string).collect(),
        stream_edits: crate::streams::plan_stream_edits(scenario),
        provisioning,
    }
}

/// Print the resolved scenario as JSON.
pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let context = RunContext::load(&args.request)?;
    let text =
        serde_json::to_string_pretty(&context.scenario).context("serialize resolved scenario")?;
    println!("{text}");
    Ok(())
}

pub fn run_plan(args: &PlanArgs) -> Result<()> {
    let context = RunContext::load(&args.request)?;
    let plan = build_plan(&context.scenario, &context.request.provision);
    if args.json {
        let text = serde_json::to_string_pretty(&plan).context("serialize case plan")?;
        println!("{text}");
        return Ok(());
    }
    print!("{}", format_plan(&plan));
    Ok(())
}

fn format_plan(plan: &CasePlan) -> String {
    let mut out = format!(
        "case: {}\ncase dir: {}\nrun dir: {}\nresolution: {}\n",
        plan.case_name,
        plan.case_dir.display(),
        plan.run_dir.display(),
        plan.resolution
    );
    out.push_str("\nxmlchange:\n");
    for directive in &plan.directives {
        out.push_str(&format!("  {directive}\n"));
    }
    if !plan.build_defines.is_empty() {
        out.push_str(&format!("\nbuild defines: {}\n", plan.build_defines.join(" ")));
    }
    out.push_str("\nuser_nl_elm:\n");
    for line in &plan.namelist {
        out.push_str(&format!("  {}\n", line.trim_start()));
    }
    if !plan.stream_edits.is_empty() {
        out.push_str("\nstream files:\n");
        for edit in &plan.stream_edits {
            out.push_str(&format!(
                "  {} <- {} ({} rules)\n",
                edit.output,
                edit.template,
                edit.rules.len()
            ));
        }
    }
    out.push_str("\ninput data:\n");
    for file in &plan.provisioning {
        match &file.path {
            Some(path) => out.push_str(&format!(
                "  {}: {} {}\n",
                file.kind,
                file.action,
                path.display()
            )),
            None => out.push_str(&format!("  {}: {}\n", file.kind, file.action)),
        }
    }
    out
}
