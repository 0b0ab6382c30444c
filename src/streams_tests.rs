use super::*;
use crate::test_support::{region_case, scenario, site_case};

const DATM_IN: &str = "\
&shr_strdata_nml
  datamode = 'CLMNCEP'
  streams = \"datm.streams.txt.CLM1PT.ELM_USRDAT 1 1 1\",
      \"datm.streams.txt.presaero.clim_2000 1 2000 2000\"
  taxmode = 'cycle', 'extend'
  vectors = 'null'
/
";

const POINT_STREAM: &str = "\
<fieldInfo>
   <filePath>
      /inputdata/atm/datm7/1x1pt_US-UMB/CLM1PT_data
   </filePath>
   <variableNames>
      FSDS swdn
      FLDS lwdn
   </variableNames>
</fieldInfo>
";

const PRESAERO: &str = "\
<fileNames>
            aerosoldep_monthly_1850_mean_1.9x2.5_c090421.nc
</fileNames>
";

fn write_templates(root: &std::path::Path, names: &[(&str, &str)]) -> CasePaths {
    let paths = CasePaths::new(root.to_path_buf());
    let dir = paths.datm_conf_dir();
    fs::create_dir_all(&dir).expect("datmconf dir");
    for (name, text) in names {
        fs::write(dir.join(name), text).expect("write template");
    }
    paths
}

#[test]
fn bypass_cases_plan_no_edits() {
    let scenario = scenario(&site_case("ICB1850CNPRDCTCBC", None));
    assert!(plan_stream_edits(&scenario).is_empty());
}

#[test]
fn site_stream_list_uses_site_years_and_climatology() {
    let scenario = scenario(&site_case("I1850ELMCN", Some(false)));
    let edits = plan_stream_edits(&scenario);
    let templates: Vec<_> = edits.iter().map(|e| e.template.as_str()).collect();
    assert_eq!(templates, [DATM_NAMELIST, PRESAERO_CLIM_1850, POINT_FORCING]);

    let out = edits[0].apply(DATM_IN);
    assert_eq!(
        out,
        "&shr_strdata_nml\n  datamode = 'CLMNCEP'\n streams = \
\"datm.streams.txt.CLM1PT.ELM_USRDAT 1 2000 2014  \", \
\"datm.streams.txt.presaero.clim_1850 1 1850 1850\", \
\"datm.streams.txt.topo.observed 1 1 1\"\n\
taxmode = 'cycle', 'extend', 'extend'\n  vectors = 'null'\n/\n"
    );

    let aerosol = edits[1].apply(PRESAERO);
    assert!(aerosol.contains("            aerosoldep_monthly_1849-2006_1.9x2.5_c090803.nc\n"));
    assert!(!aerosol.contains("1850_mean"));
}

#[test]
fn site_with_reanalysis_forcing_uses_gridded_streams() {
    let mut descriptor = site_case("I1850ELMCN", Some(false));
    descriptor.forcing.kind = Some("gswp3".to_string());
    descriptor.forcing.directory = Some(PathBuf::from("/inputdata/atm/datm7/GSWP3"));
    let scenario = scenario(&descriptor);
    assert_eq!(
        crate::directives::compile(&scenario).value_of("DATM_MODE"),
        Some("CLMCRUNCEP")
    );

    let edits = plan_stream_edits(&scenario);
    let templates: Vec<_> = edits.iter().map(|e| e.template.as_str()).collect();
    assert_eq!(templates, [DATM_NAMELIST, PRESAERO_CLIM_1850]);

    let out = edits[0].apply(DATM_IN);
    for stream in ["Solar", "Precip", "TPQW"] {
        assert!(out.contains(&format!("\"datm.streams.txt.CLMCRUNCEP.{stream} ")));
    }
    assert!(!out.contains("CLM1PT"));
}

#[test]
fn transient_region_adds_co2_stream_and_extra_extend() {
    let scenario = scenario(&region_case("20TR transient", None));
    let edits = plan_stream_edits(&scenario);
    let templates: Vec<_> = edits.iter().map(|e| e.template.as_str()).collect();
    assert_eq!(templates, [DATM_NAMELIST, CO2_TRANSIENT]);

    let out = edits[0].apply(DATM_IN);
    assert!(out.contains("\"datm.streams.txt.CLMCRUNCEP.Solar 1901 1901 2014  \""));
    assert!(out.contains("\"datm.streams.txt.CLMCRUNCEP.TPQW 1901 1901 2014  \""));
    assert!(out.contains(
        "\"datm.streams.txt.presaero.trans_1850-2000 1850 1850 2000\", \
\"datm.streams.txt.co2tseries.20tr 1766 1766 2010\""
    ));
    assert!(out.contains("taxmode = 'cycle', 'extend', 'extend', 'extend'\n"));

    let co2 = edits[1].apply("<fileNames>\n  fco2_old.nc\n</fileNames>\n");
    assert_eq!(
        co2,
        "<fileNames>\n      /inputdata/atm/datm7/CO2/fco2_datm_rcp4.5_1765-2500_c130312.nc\n</fileNames>\n"
    );
}

#[test]
fn point_forcing_swaps_directory_tokens_and_drops_longwave_with_fates() {
    let plain = plan_stream_edits(&scenario(&site_case("I1850ELMCN", Some(false))));
    let out = plain[2].apply(POINT_STREAM);
    assert!(out.contains("/inputdata/atm/datm7/CLM1PT_data/1x1pt_US-UMB\n"));
    assert!(out.contains("FLDS lwdn"));

    let fates = plan_stream_edits(&scenario(&site_case("I2000FATES", Some(false))));
    let out = fates.last().expect("point edit").apply(POINT_STREAM);
    assert!(!out.contains("FLDS"));
    assert!(out.contains("FSDS swdn"));
}

#[test]
fn patch_writes_user_copies_into_case_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_templates(
        dir.path(),
        &[
            (DATM_NAMELIST, DATM_IN),
            (PRESAERO_CLIM_1850, PRESAERO),
            (POINT_FORCING, POINT_STREAM),
        ],
    );
    let scenario = scenario(&site_case("I1850ELMCN", Some(false)));
    let written = patch_case_streams(&scenario, &paths).expect("patch");

    assert_eq!(written.len(), 3);
    let nl = fs::read_to_string(dir.path().join("user_nl_datm")).expect("user_nl_datm");
    assert!(nl.contains("ELM_USRDAT 1 2000 2014"));
    assert!(dir
        .path()
        .join("user_datm.streams.txt.CLM1PT.ELM_USRDAT")
        .is_file());
}

#[test]
fn missing_template_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_templates(dir.path(), &[(DATM_NAMELIST, DATM_IN)]);
    let scenario = scenario(&site_case("I1850ELMCN", Some(false)));

    let err = patch_case_streams(&scenario, &paths).expect_err("missing template");
    assert!(matches!(err, CaseError::Precondition(_)));
    assert!(!dir.path().join("user_nl_datm").exists());
}
