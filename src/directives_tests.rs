use super::*;
use crate::case::RestartLineage;
use crate::test_support::{region_case, scenario, scenario_on, site_case};
use std::path::PathBuf;

#[test]
fn site_bypass_spinup_starts_at_year_one() {
    let set = compile(&scenario(&site_case("1850 spinup", Some(true))));

    assert_eq!(set.value_of("RUN_STARTDATE"), Some("0001-01-01"));
    assert_eq!(set.value_of("ELM_USRDAT_NAME"), Some("1x1pt_US-UMB"));
    assert_eq!(set.value_of("DATM_MODE"), None);
    assert_eq!(set.value_of("REST_N"), Some("1"));
    assert_eq!(set.build_defines(), ["-DCPL_BYPASS".to_string()]);
    assert!(set.value_of("CCSM_BGC").is_none());
}

#[test]
fn transient_region_enables_co2_and_regional_restart_interval() {
    let mut descriptor = region_case("20TR transient", None);
    descriptor.run_years = 165;
    let set = compile(&scenario(&descriptor));

    assert!(set.contains("CCSM_BGC", "CO2A"));
    assert!(set.contains("ELM_CO2_TYPE", "diagnostic"));
    assert_eq!(set.value_of("DATM_MODE"), Some("CLMCRUNCEP"));
    assert_eq!(set.value_of("STOP_N"), Some("165"));
    assert_eq!(set.value_of("REST_N"), Some("20"));
    assert_eq!(set.value_of("RUN_STARTDATE"), Some("1850-01-01"));
    assert!(set.build_defines().is_empty());
}

#[test]
fn point_forcing_without_bypass_sets_year_range() {
    let set = compile(&scenario(&site_case("I1850ELMCN", Some(false))));
    assert_eq!(set.value_of("DATM_MODE"), Some("CLM1PT"));
    assert_eq!(set.value_of("DATM_CLMNCEP_YR_START"), Some("2000"));
    assert_eq!(set.value_of("DATM_CLMNCEP_YR_END"), Some("2014"));
}

#[test]
fn task_counts_are_uniform_across_components() {
    let mut descriptor = site_case("ICBELMBC", None);
    descriptor.processors = 8;
    let set = compile(&scenario(&descriptor));
    for component in COMPONENTS {
        assert_eq!(set.value_of(&format!("NTASKS_{component}")), Some("8"));
        assert_eq!(set.value_of(&format!("NTHRDS_{component}")), Some("1"));
    }
}

#[test]
fn timestep_and_machine_drive_optional_directives() {
    let mut descriptor = site_case("ICBELMBC", None);
    descriptor.timestep_hours = 0.5;
    let set = compile(&scenario_on(&descriptor, "pm-cpu"));
    assert_eq!(set.value_of("ATM_NCPL"), None);
    assert_eq!(set.value_of("PIO_TYPENAME"), None);

    descriptor.timestep_hours = 3.0;
    let set = compile(&scenario_on(&descriptor, "cades-baseline"));
    assert_eq!(set.value_of("ATM_NCPL"), Some("8"));
    assert_eq!(set.value_of("PIO_TYPENAME"), Some("netcdf"));
}

#[test]
fn ad_spinup_restart_and_cppdefs_are_appended() {
    let mut descriptor = site_case("ICB1850CNPRDCTCBC", None);
    descriptor.suffix = "_ad_spinup".to_string();
    descriptor.cppdefs = vec!["HUM_HOL".to_string(), " ".to_string()];
    descriptor.restart = Some(RestartLineage::Case {
        case: "prev".to_string(),
        year: 41,
    });
    let set = compile(&scenario(&descriptor));

    let appended: Vec<String> = set
        .iter()
        .filter(|d| d.mode == DirectiveMode::Append)
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        appended,
        [
            "--append ELM_BLDNML_OPTS=-bgc_spinup on",
            "--append ELM_CONFIG_OPTS= -cppdefs -DHUM_HOL",
        ]
    );
    assert_eq!(set.value_of("RUN_REFDATE"), Some("0041-01-01"));
}

#[test]
fn domain_directives_follow_supplied_file() {
    let mut descriptor = site_case("ICBELMBC", None);
    let set = compile(&scenario(&descriptor));
    assert_eq!(set.value_of("ATM_DOMAIN_PATH"), Some("${RUNDIR}"));
    assert_eq!(set.value_of("LND_DOMAIN_FILE"), Some("domain.nc"));

    descriptor.files.domain = Some(PathBuf::from("/data/domains/domain.lnd.US-UMB.nc"));
    let set = compile(&scenario(&descriptor));
    assert_eq!(set.value_of("LND_DOMAIN_PATH"), Some("/data/domains"));
    assert_eq!(set.value_of("ATM_DOMAIN_FILE"), Some("domain.lnd.US-UMB.nc"));
}

#[test]
fn xmlchange_args_mark_appends() {
    let directive = Directive {
        key: "ELM_BLDNML_OPTS".to_string(),
        value: "-bgc_spinup on".to_string(),
        mode: DirectiveMode::Append,
    };
    assert_eq!(
        directive.xmlchange_args(),
        ["--append", "ELM_BLDNML_OPTS=-bgc_spinup on"]
    );
}
