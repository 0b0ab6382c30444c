//! Fixtures shared by unit tests.
use crate::case::{CaseDescriptor, ModeOverrides, RegionSpec};
use crate::directives::Directive;
use crate::error::CaseResult;
use crate::resolve::{resolve, ForcingTable, ResolveContext, ResolvedScenario, SiteTable};
use crate::settings::{CasePaths, RootDirs};
use crate::toolchain::{NewCase, StepOutput, Toolchain};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const SITES: &str = "\
site_code,name,state,lon,lat,elev,startyear,endyear,alignyear,timezone
US-UMB,UMBS,MI,-84.71,45.56,234,2000,2014,1,-5
";

pub(crate) fn roots() -> RootDirs {
    RootDirs {
        model: PathBuf::from("/model"),
        input_data: PathBuf::from("/inputdata"),
        run: PathBuf::from("/runs"),
        case: PathBuf::from("/cases"),
        exe: None,
    }
}

pub(crate) fn site_case(family: &str, bypass: Option<bool>) -> CaseDescriptor {
    CaseDescriptor {
        case_id: "t".to_string(),
        compset: family.to_string(),
        site: Some("US-UMB".to_string()),
        modes: ModeOverrides {
            bypass,
            ..ModeOverrides::default()
        },
        ..CaseDescriptor::default()
    }
}

pub(crate) fn region_case(family: &str, bypass: Option<bool>) -> CaseDescriptor {
    CaseDescriptor {
        case_id: "t".to_string(),
        compset: family.to_string(),
        region: Some(RegionSpec::default()),
        modes: ModeOverrides {
            bypass,
            ..ModeOverrides::default()
        },
        ..CaseDescriptor::default()
    }
}

pub(crate) fn scenario(descriptor: &CaseDescriptor) -> ResolvedScenario {
    scenario_on(descriptor, "linux-generic")
}

pub(crate) fn scenario_on(descriptor: &CaseDescriptor, machine: &str) -> ResolvedScenario {
    resolve_with(descriptor, &roots(), machine)
}

/// Roots under `dir`, created on disk.
pub(crate) fn temp_roots(dir: &Path) -> RootDirs {
    let roots = RootDirs {
        model: dir.join("model"),
        input_data: dir.join("inputdata"),
        run: dir.join("runs"),
        case: dir.join("cases"),
        exe: None,
    };
    for (_, path) in roots.required() {
        fs::create_dir_all(path).expect("create root");
    }
    roots
}

pub(crate) fn scenario_with_roots(
    descriptor: &CaseDescriptor,
    roots: &RootDirs,
) -> ResolvedScenario {
    resolve_with(descriptor, roots, "linux-generic")
}

fn resolve_with(descriptor: &CaseDescriptor, roots: &RootDirs, machine: &str) -> ResolvedScenario {
    let sites = SiteTable::parse(SITES);
    let table = ForcingTable::default();
    resolve(
        descriptor,
        &ResolveContext {
            roots,
            machine,
            forcing_table: &table,
            site_table: Some(&sites),
        },
    )
    .expect("resolve test scenario")
}

/// Toolchain double that records calls; only `create_case` touches disk.
#[derive(Default)]
pub(crate) struct RecordingToolchain {
    pub(crate) calls: RefCell<Vec<String>>,
    pub(crate) submit_stdout: String,
}

impl RecordingToolchain {
    pub(crate) fn with_stdout(stdout: &str) -> Self {
        Self {
            submit_stdout: stdout.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Toolchain for RecordingToolchain {
    fn create_case(&self, request: &NewCase<'_>) -> CaseResult<()> {
        fs::create_dir_all(request.case_dir).expect("create case dir");
        self.record(format!("create_newcase {}", request.args().join(" ")));
        Ok(())
    }

    fn xmlchange(&self, _case: &CasePaths, directive: &Directive) -> CaseResult<()> {
        self.record(format!("xmlchange {directive}"));
        Ok(())
    }

    fn setup(&self, _case: &CasePaths) -> CaseResult<()> {
        self.record("case.setup".to_string());
        Ok(())
    }

    fn build(&self, _case: &CasePaths, clean: bool) -> CaseResult<()> {
        self.record(format!("case.build clean={clean}"));
        Ok(())
    }

    fn preview_namelists(&self, _case: &CasePaths) -> CaseResult<()> {
        self.record("preview_namelists".to_string());
        Ok(())
    }

    fn submit(&self, _case: &CasePaths, args: &[String]) -> CaseResult<StepOutput> {
        self.record(format!("case.submit {}", args.join(" ")).trim_end().to_string());
        Ok(StepOutput {
            stdout: self.submit_stdout.clone(),
            stderr: String::new(),
        })
    }
}
