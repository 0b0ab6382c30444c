//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use elm_case::case::{CaseDescriptor, ModeOverrides};
use elm_case::directives::Directive;
use elm_case::error::{CaseError, CaseResult};
use elm_case::lifecycle::CollisionPolicy;
use elm_case::resolve::{
    load_site_table, resolve, ForcingTable, ResolveContext, ResolvedScenario, SiteTable,
};
use elm_case::settings::{
    BuildSettings, CasePaths, ProvisionSettings, RootDirs, RunRequest, REQUEST_SCHEMA_VERSION,
};
use elm_case::submit::SchedulerMode;
use elm_case::toolchain::{NewCase, StepOutput, Toolchain};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MACHINE: &str = "linux-generic";
pub const SITE: &str = "US-UMB";

const SITE_TABLE: &str = "\
site_code,name,state,lon,lat,elev,startyear,endyear,alignyear,timezone
US-UMB,UMBS,MI,-84.71,45.56,234,2000,2014,1,-5
US-Ha1,Harvard Forest,MA,-72.17,42.54,340,1991,2012,1,-5
";

const DATM_IN: &str = "\
&datm_nml
  decomp = '1d'
/
&shr_strdata_nml
  dtlimit = 1.5, 1.5, 1.5
  streams = 'datm.streams.txt.CLM1PT.ELM_USRDAT 1 1 1',
      'datm.streams.txt.presaero.clim_2000 1 2000 2000'
  taxmode = 'cycle', 'cycle'
  vectors = 'null'
/
";

const PRESAERO_CLIM_1850: &str = "\
<fieldInfo>
   <filePath>
            /inputdata/atm/cam/chem/trop_mozart_aero/aero
   </filePath>
   <fileNames>
            aerosoldep_monthly_1850_mean_1.9x2.5_c090421.nc
   </fileNames>
</fieldInfo>
";

const CO2_TSERIES: &str = "\
<fieldInfo>
   <fileNames>
      fco2_datm_1765-2007_c100614.nc
   </fileNames>
</fieldInfo>
";

const POINT_FORCING: &str = "\
<fieldInfo>
   <filePath>
      /inputdata/atm/datm7/CLM1PT_data/1x1pt_US-UMB
   </filePath>
   <variableNames>
      TBOT     tbot
      FLDS     lwdn
   </variableNames>
</fieldInfo>
";

/// Root directories, a site table, and default parameter files on disk.
pub struct Fixture {
    pub dir: TempDir,
    pub roots: RootDirs,
}

impl Fixture {
    pub fn setup() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let roots = RootDirs {
            model: root.join("E3SM"),
            input_data: root.join("inputdata"),
            run: root.join("runs"),
            case: root.join("cases"),
            exe: None,
        };
        for (_, path) in roots.required() {
            fs::create_dir_all(path).expect("create root");
        }
        let table = SiteTable::path_for(&roots.input_data, "AmeriFlux");
        fs::create_dir_all(table.parent().expect("table dir")).expect("create table dir");
        fs::write(&table, SITE_TABLE).expect("write site table");

        let params = roots.input_data.join("lnd/clm2/paramdata");
        fs::create_dir_all(&params).expect("create param dir");
        for name in ["clm_params_c180312.nc", "CNP_parameters_c131108.nc", "fates_params_c1.nc"] {
            fs::write(params.join(name), name).expect("write param file");
        }
        Self { dir, roots }
    }

    pub fn param_dir(&self) -> PathBuf {
        self.roots.input_data.join("lnd/clm2/paramdata")
    }

    pub fn site_case(&self, compset: &str, bypass: Option<bool>) -> CaseDescriptor {
        CaseDescriptor {
            case_id: "t".to_string(),
            compset: compset.to_string(),
            site: Some(SITE.to_string()),
            modes: ModeOverrides {
                bypass,
                ..ModeOverrides::default()
            },
            ..CaseDescriptor::default()
        }
    }

    pub fn request(&self, case: CaseDescriptor) -> RunRequest {
        RunRequest {
            schema_version: REQUEST_SCHEMA_VERSION,
            roots: self.roots.clone(),
            machine: Some(MACHINE.to_string()),
            project: None,
            compiler: None,
            forcing_table: None,
            collision: CollisionPolicy::Abort,
            scheduler: SchedulerMode::Present,
            provision: ProvisionSettings::default(),
            build: BuildSettings::default(),
            case,
        }
    }

    pub fn write_request(&self, request: &RunRequest) -> PathBuf {
        let path = self.dir.path().join("request.json");
        let text = serde_json::to_string_pretty(request).expect("serialize request");
        fs::write(&path, text).expect("write request");
        path
    }

    pub fn scenario(&self, descriptor: &CaseDescriptor) -> ResolvedScenario {
        let sites = load_site_table(descriptor, &self.roots).expect("site table");
        resolve(
            descriptor,
            &ResolveContext {
                roots: &self.roots,
                machine: MACHINE,
                forcing_table: &ForcingTable::default(),
                site_table: sites.as_ref(),
            },
        )
        .expect("resolve scenario")
    }
}

/// Toolchain double that lays down the files a real case setup produces.
pub struct FakeToolchain {
    calls: RefCell<Vec<String>>,
    param_dir: PathBuf,
    submit_stdout: String,
    build_failure: Option<String>,
}

impl FakeToolchain {
    pub fn new(fixture: &Fixture, submit_stdout: &str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            param_dir: fixture.param_dir(),
            submit_stdout: submit_stdout.to_string(),
            build_failure: None,
        }
    }

    /// Make `case.build` fail with `detail`, the way a compile error surfaces.
    pub fn failing_build(mut self, detail: &str) -> Self {
        self.build_failure = Some(detail.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn write_setup_outputs(&self, case: &Path) {
        let elmconf = case.join("Buildconf/elmconf");
        fs::create_dir_all(&elmconf).expect("create elmconf");
        let lnd_in = format!(
            "&clm_inparm\n paramfile = '{dir}/clm_params_c180312.nc'\n fsoilordercon = '{dir}/CNP_parameters_c131108.nc'\n fates_paramfile = '{dir}/fates_params_c1.nc'\n/\n",
            dir = self.param_dir.display()
        );
        fs::write(elmconf.join("lnd_in"), lnd_in).expect("write lnd_in");

        let datmconf = case.join("Buildconf/datmconf");
        fs::create_dir_all(&datmconf).expect("create datmconf");
        for (name, text) in [
            ("datm_in", DATM_IN),
            ("datm.streams.txt.presaero.clim_1850", PRESAERO_CLIM_1850),
            ("datm.streams.txt.co2tseries.20tr", CO2_TSERIES),
            ("datm.streams.txt.CLM1PT.ELM_USRDAT", POINT_FORCING),
        ] {
            fs::write(datmconf.join(name), text).expect("write datm template");
        }
        fs::write(case.join("Macros.make"), "CPPDEFS := -DLINUX\nSLIBS += -llapack\n")
            .expect("write Macros.make");
    }
}

impl Toolchain for FakeToolchain {
    fn create_case(&self, request: &NewCase<'_>) -> CaseResult<()> {
        fs::create_dir_all(request.case_dir).expect("create case dir");
        fs::write(request.case_dir.join("user_nl_elm"), "").expect("write user_nl_elm");
        self.record("create_newcase");
        Ok(())
    }

    fn xmlchange(&self, _case: &CasePaths, directive: &Directive) -> CaseResult<()> {
        self.record(format!("xmlchange {directive}"));
        Ok(())
    }

    fn setup(&self, case: &CasePaths) -> CaseResult<()> {
        self.write_setup_outputs(case.root());
        self.record("case.setup");
        Ok(())
    }

    fn build(&self, case: &CasePaths, clean: bool) -> CaseResult<()> {
        self.record(format!("case.build clean={clean}"));
        match &self.build_failure {
            Some(detail) => Err(CaseError::Toolchain {
                step: "case.build".to_string(),
                detail: detail.clone(),
                log: Some(case.log("case_build.log")),
            }),
            None => Ok(()),
        }
    }

    fn preview_namelists(&self, _case: &CasePaths) -> CaseResult<()> {
        self.record("preview_namelists");
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
