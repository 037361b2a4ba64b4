use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

const PEOPLE_XML: &str = "<Root><Sample><Name>Alice</Name><Age>30</Age></Sample><Sample><Name>Bob</Name><City>NYC</City></Sample></Root>";

fn bin() -> Command {
    Command::cargo_bin("xml-sample-csv",).expect("binary should be built",)
}

#[test]
fn test_cli_converts_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("people.xml",), PEOPLE_XML,).unwrap();
    fs::write(dir.path().join("broken.xml",), "<Root><Sample>",).unwrap();

    let output = bin()
        .arg("--xml-dir",)
        .arg(dir.path(),)
        .env("NO_COLOR", "1",)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr,);
    assert!(stderr.contains("Found 2 XML file(s) to process"));
    assert!(stderr.contains("Error parsing XML file"));
    assert!(output.stdout.is_empty());
    assert_eq!(
        fs::read_to_string(dir.path().join("csv").join("people.csv")).unwrap(),
        "Name,Age,City\r\nAlice,30,\r\nBob,,NYC\r\n"
    );
}

#[test]
fn test_cli_missing_directory_exits_cleanly() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("xml",);

    let output = bin().arg("--xml-dir",).arg(&missing,).output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
    assert!(!missing.exists());
}

#[test]
fn test_cli_json_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("people.xml",), PEOPLE_XML,).unwrap();
    fs::write(dir.path().join("none.xml",), "<Root/>",).unwrap();

    let output = bin()
        .arg("--xml-dir",)
        .arg(dir.path(),)
        .args(["--format", "json"],)
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout,).unwrap();
    assert_eq!(report["discovered"], 2);
    assert_eq!(report["converted"], 1);
    assert_eq!(report["without_samples"], 1);
    assert_eq!(report["failed"], 0);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Found 2 XML file(s) to process"));
}

#[test]
fn test_cli_log_file() {
    let dir = tempdir().unwrap();
    let xml_dir = dir.path().join("xml",);
    fs::create_dir(&xml_dir,).unwrap();
    fs::write(xml_dir.join("people.xml",), PEOPLE_XML,).unwrap();
    let log = dir.path().join("convert.log",);

    bin()
        .arg("--xml-dir",)
        .arg(&xml_dir,)
        .arg("--log-file",)
        .arg(&log,)
        .assert()
        .success();

    let logged = fs::read_to_string(&log,).unwrap();
    assert!(logged.contains("Successfully converted"));
    assert!(logged.contains("Created 3 column(s)"));
}
