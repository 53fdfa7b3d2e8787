// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::process::{Command, Output};

/// A small catalog whose orbits are cheap to compute: a 2-input AND and a
/// pass-through, each padded to eight pins.
const SMALL_CONFIG: &str = r#"
[[cell]]
name = "and2"
pins = ["A", "B", "U2", "U3", "U4", "U5", "U6", "U7"]
output = "Y"
function = "A * B"

[[cell]]
name = "pass"
pins = ["A", "U1", "U2", "U3", "U4", "U5", "U6", "U7"]
output = "Y"
function = "A"

[synth]
library_name = "small_luts"
yosys_path = "/nonexistent/yosys"
"#;

const NETLIST: &str = "module top(input a, input b, output y, output z, output w);\n  \
                       assign y = 4'h8 >> {a, b};\n  \
                       assign z = 4'h6 >> {a, b};\n  \
                       assign w = 2'h2 >> b;\nendmodule\n";

fn driver(args: &[&str], cwd: &Path) -> Output {
    let command_path = env!("CARGO_BIN_EXE_cellmap-driver");
    Command::new(command_path)
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("Failed to run cellmap-driver")
}

fn assert_success(output: &Output) -> String {
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn workspace() -> tempfile::TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("small.toml"), SMALL_CONFIG).unwrap();
    std::fs::write(temp_dir.path().join("top.v"), NETLIST).unwrap();
    temp_dir
}

#[test]
fn test_version_subcommand() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stdout = assert_success(&driver(&["version"], temp_dir.path()));
    assert_eq!(stdout.trim(), env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_orbit_stats_reference_catalog() {
    let temp_dir = tempfile::tempdir().unwrap();
    let stdout = assert_success(&driver(&["orbit-stats"], temp_dir.path()));
    assert!(stdout.contains("c1: orbit=20160"), "{stdout}");
    assert!(stdout.contains("c2: orbit=10080"), "{stdout}");
    assert!(stdout.contains("total library cells: 30240"), "{stdout}");
}

#[test]
fn test_orbit_stats_uses_cwd_config() {
    let temp_dir = workspace();
    std::fs::copy(
        temp_dir.path().join("small.toml"),
        temp_dir.path().join("cellmap.toml"),
    )
    .unwrap();
    let stdout = assert_success(&driver(&["orbit-stats"], temp_dir.path()));
    assert!(stdout.contains("and2: orbit=28"), "{stdout}");
    assert!(stdout.contains("pass: orbit=8"), "{stdout}");
}

#[test]
fn test_lib_gen_writes_library() {
    let temp_dir = workspace();
    let stdout = assert_success(&driver(
        &[
            "--config",
            "small.toml",
            "lib-gen",
            "--output",
            "small.lib",
            "--no_flops",
        ],
        temp_dir.path(),
    ));
    assert!(stdout.contains("36 LUT cells and 0 flip-flops"), "{stdout}");
    let lib = std::fs::read_to_string(temp_dir.path().join("small.lib")).unwrap();
    assert!(lib.starts_with("library(small_luts) {"));
    assert!(lib.contains("cell(lut_and2_27)"));
    assert!(lib.contains("cell(lut_pass_7)"));
    assert!(!lib.contains("cell(DFF)"));
}

#[test]
fn test_classify_text_report() {
    let temp_dir = workspace();
    let stdout = assert_success(&driver(
        &["--config", "small.toml", "classify", "top.v"],
        temp_dir.path(),
    ));
    assert!(stdout.contains("LUT 0: assign y width=2 table=0x8: and2"), "{stdout}");
    assert!(stdout.contains("LUT 1: assign z width=2 table=0x6: no match"), "{stdout}");
    assert!(stdout.contains("LUT 2: assign w width=1 table=0x2: pass"), "{stdout}");
    assert!(stdout.contains("matching and2: 1"), "{stdout}");
    assert!(stdout.contains("matching pass: 1"), "{stdout}");
    assert!(stdout.contains("matching no cell: 1"), "{stdout}");
}

#[test]
fn test_classify_json_lines() {
    let temp_dir = workspace();
    let stdout = assert_success(&driver(
        &["--config", "small.toml", "classify", "top.v", "--json"],
        temp_dir.path(),
    ));
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["output"], "y");
    assert_eq!(rows[0]["matches"][0]["cell"], "and2");
    assert_eq!(rows[0]["matches"][0]["witness"]["placement"], serde_json::json!([0, 1]));
    assert_eq!(rows[1]["matches"], serde_json::json!([]));
    assert_eq!(rows[3]["summary"]["total"], 3);
    assert_eq!(rows[3]["summary"]["unmatched"], 1);
}

#[test]
fn test_remap_rewrites_netlist() {
    let temp_dir = workspace();
    let stdout = assert_success(&driver(
        &[
            "--config",
            "small.toml",
            "remap",
            "top.v",
            "--output",
            "remapped.v",
        ],
        temp_dir.path(),
    ));
    assert!(stdout.contains("2 LUTs rewritten, 1 left as written"), "{stdout}");
    let remapped = std::fs::read_to_string(temp_dir.path().join("remapped.v")).unwrap();
    assert!(remapped.contains("and2 cellmap_0 (.A(b), .B(a), "), "{remapped}");
    assert!(remapped.contains("pass cellmap_2 (.A(b), "), "{remapped}");
    assert!(remapped.contains("assign z = 4'h6 >> {a, b};"));
    assert!(remapped.contains("module and2("));
    assert!(remapped.contains("module pass("));
}

#[test]
fn test_synth_reports_missing_yosys() {
    let temp_dir = workspace();
    let output = driver(
        &[
            "--config",
            "small.toml",
            "synth",
            "top.v",
            "--top",
            "top",
            "--output",
            "mapped.v",
        ],
        temp_dir.path(),
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("synth:"), "{stderr}");
    assert!(stderr.contains("/nonexistent/yosys"), "{stderr}");
}

#[test]
fn test_missing_config_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = driver(&["--config", "nope.toml", "orbit-stats"], temp_dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file does not exist"), "{stderr}");
}
