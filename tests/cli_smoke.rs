use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const OVERRIDES: [&str; 4] = [
    "AXBRIDGE_LOG_LEVEL",
    "AXBRIDGE_USE_FIRST_MATCH",
    "AXBRIDGE_BOUND_ELEMENTS_BY_INDEX",
    "AXBRIDGE_FIXTURE",
];

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/two_buttons.json")
}

/// Binary isolated from the user's config file and environment overrides.
fn axbridge(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("axbridge").unwrap();
    for name in OVERRIDES {
        cmd.env_remove(name);
    }
    cmd.env_remove("RUST_LOG");
    cmd.arg("--config")
        .arg(config_dir.path().join("config.yaml"))
        .arg("--log-level")
        .arg("warn");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn find_first_reads_attributes() {
    let dir = TempDir::new().unwrap();
    let report = json_stdout(
        axbridge(&dir)
            .args(["--output", "json", "find", "--fixture"])
            .arg(fixture())
            .args([
                "--value",
                r#"//XCUIElementTypeButton[@text="OK"]"#,
                "--first",
                "--attribute",
                "text",
                "--attribute",
                "enabled",
            ]),
    );
    let matches = report["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["index_path"], "/0/0");
    assert_eq!(matches[0]["element_type"], "XCUIElementTypeButton");
    assert_eq!(matches[0]["attributes"]["text"], "OK");
    assert_eq!(matches[0]["attributes"]["enabled"], "true");
    assert_eq!(report["mode"], "first");
}

#[test]
fn find_by_class_name_with_stats() {
    let dir = TempDir::new().unwrap();
    let report = json_stdout(
        axbridge(&dir)
            .args(["--output", "json", "find", "--fixture"])
            .arg(fixture())
            .args(["--using", "class name", "--value", "Button", "--all", "--stats"]),
    );
    assert_eq!(report["matches"].as_array().unwrap().len(), 2);
    assert_eq!(report["stats"]["locate"]["total"], 1);
    assert_eq!(report["stats"]["matches"], 2);
}

#[test]
fn malformed_query_fails() {
    let dir = TempDir::new().unwrap();
    let assert = axbridge(&dir)
        .args(["find", "--fixture"])
        .arg(fixture())
        .args(["--value", "//XCUIElementTypeButton[@text="])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("invalid selector"), "{stderr}");
}

#[test]
fn unknown_attribute_fails() {
    let dir = TempDir::new().unwrap();
    let assert = axbridge(&dir)
        .args(["find", "--fixture"])
        .arg(fixture())
        .args(["--value", "//XCUIElementTypeWindow", "--attribute", "bogus"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("invalid argument"), "{stderr}");
}

#[test]
fn source_renders_xml_and_description() {
    let dir = TempDir::new().unwrap();
    let xml = axbridge(&dir)
        .args(["source", "--index-paths", "--fixture"])
        .arg(fixture())
        .assert()
        .success();
    let xml = String::from_utf8_lossy(&xml.get_output().stdout).to_string();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains(r#"indexPath="/0/1""#));

    let description = axbridge(&dir)
        .args(["source", "--format", "description", "--fixture"])
        .arg(fixture())
        .assert()
        .success();
    let description = String::from_utf8_lossy(&description.get_output().stdout).to_string();
    assert!(description.contains("identifier: 'ButtonB'"));
    assert!(description.contains("Disabled"));
}

#[test]
fn fixture_can_come_from_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.yaml"),
        format!(
            "fixture: {}\nuse_first_match: true\n",
            serde_json::to_string(&fixture()).unwrap()
        ),
    )
    .unwrap();
    let report = json_stdout(
        axbridge(&dir).args(["--output", "json", "find", "--using", "accessibility id", "--value", "ButtonB"]),
    );
    assert_eq!(report["mode"], "first");
    assert_eq!(report["matches"][0]["index_path"], "/0/1");
}

#[test]
fn missing_fixture_is_reported() {
    let dir = TempDir::new().unwrap();
    axbridge(&dir)
        .args(["source"])
        .assert()
        .failure();
}

#[test]
fn attribute_table_lists_aliases() {
    let dir = TempDir::new().unwrap();
    let table = json_stdout(axbridge(&dir).args(["--output", "json", "attributes"]));
    let rows = table.as_array().unwrap();
    assert_eq!(rows.len(), 11);
    let frame = rows.iter().find(|row| row["name"] == "frame").unwrap();
    assert_eq!(frame["aliases"][0], "rect");
}
