//! Command-line tests for the commands that never touch a case.
mod common;

use common::Fixture;
use std::path::Path;
use std::process::{Command, Output};

fn elmcase(fixture: &Fixture, args: &[&str]) -> Output {
    let config_home = fixture.dir.path().join("config");
    Command::new(env!("CARGO_BIN_EXE_elmcase"))
        .args(args)
        .current_dir(fixture.dir.path())
        .env("XDG_CONFIG_HOME", &config_home)
        .env("RUST_LOG", "warn")
        .env_remove("ELMCASE_PROVISION_COMMAND")
        .output()
        .expect("run elmcase")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn init_writes_stub_and_refuses_to_overwrite() {
    let fixture = Fixture::setup();
    let out = fixture.dir.path().join("stub.json");

    let first = elmcase(&fixture, &["init", "--out", path_arg(&out)]);
    assert!(first.status.success(), "{first:?}");
    let stub: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out).expect("read stub")).expect("parse stub");
    assert_eq!(stub["schema_version"], 1);
    assert_eq!(stub["case"]["site"], "US-UMB");

    let second = elmcase(&fixture, &["init", "--out", path_arg(&out)]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = elmcase(&fixture, &["init", "--out", path_arg(&out), "--force"]);
    assert!(forced.status.success(), "{forced:?}");
}

#[test]
fn plan_json_reports_compiled_configuration() {
    let fixture = Fixture::setup();
    let request = fixture.request(fixture.site_case("I1850ELMCN", Some(false)));
    let path = fixture.write_request(&request);

    let output = elmcase(&fixture, &["plan", "--request", path_arg(&path), "--json"]);
    assert!(output.status.success(), "{output:?}");
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("plan json");
    assert_eq!(plan["case_name"], "t_US-UMB_I1850ELMCN");
    assert_eq!(plan["resolution"], "ELM_USRDAT");
    let directives = plan["directives"].as_array().expect("directives");
    assert!(directives
        .iter()
        .any(|d| d.as_str() == Some("RUN_STARTDATE=0001-01-01")));
    let edits = plan["stream_edits"].as_array().expect("stream edits");
    assert!(edits.iter().any(|e| e["output"] == "user_nl_datm"));
    assert!(!fixture.roots.case.join("t_US-UMB_I1850ELMCN").exists());
}

#[test]
fn resolve_rejects_unknown_site() {
    let fixture = Fixture::setup();
    let mut descriptor = fixture.site_case("I1850ELMCN", Some(false));
    descriptor.site = Some("XX-Nope".to_string());
    let path = fixture.write_request(&fixture.request(descriptor));

    let output = elmcase(&fixture, &["resolve", "--request", path_arg(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("XX-Nope"));
}
