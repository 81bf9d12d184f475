use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use viamill::{MachinePlan, Point3, Segment, Setup};

fn write_square(dir: &Path) -> std::path::PathBuf {
    let corners = [
        Point3::xy(0.0, 0.0),
        Point3::xy(30.0, 0.0),
        Point3::xy(30.0, 30.0),
        Point3::xy(0.0, 30.0),
    ];
    let segments: Vec<Segment> = (0..4)
        .map(|i| Segment::line(corners[i], corners[(i + 1) % 4]))
        .collect();
    let path = dir.join("square.json");
    let json = serde_json::json!({ "segments": segments });
    std::fs::write(&path, json.to_string()).unwrap();
    path
}

fn viamill() -> Command {
    Command::new(env!("CARGO_BIN_EXE_viamill"))
}

#[test]
fn test_gcode_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_square(dir.path());

    let output = viamill().arg(&input).output().unwrap();
    assert!(output.status.success());

    let gcode = String::from_utf8(output.stdout).unwrap();
    assert!(gcode.starts_with("(----"));
    assert!(gcode.contains("G21 (Metric/mm)"));
    assert!(gcode.contains("G01 Z-9.000000"));
    assert!(gcode.ends_with("M02\n"));
}

#[test]
fn test_plan_output_with_setup_and_overrides() {
    let dir = TempDir::new().unwrap();
    let input = write_square(dir.path());

    let mut setup = Setup::new();
    setup.mill.depth = -2.0;
    setup.mill.step = -1.0;
    let setup_path = dir.path().join("setup.toml");
    setup.save_to_file(&setup_path).unwrap();

    let plan_path = dir.path().join("plan.json");
    let status = viamill()
        .arg(&input)
        .arg("--setup")
        .arg(&setup_path)
        .arg("--set")
        .arg("mill.fast_move_z=10")
        .arg("--format")
        .arg("plan")
        .arg("--output")
        .arg(&plan_path)
        .status()
        .unwrap();
    assert!(status.success());

    let plan: MachinePlan =
        serde_json::from_str(&std::fs::read_to_string(&plan_path).unwrap()).unwrap();
    assert_eq!(plan.fast_move_z, 10.0);
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].depth, -2.0);
}

#[test]
fn test_unknown_format_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_square(dir.path());

    let output = viamill().arg(&input).args(["--format", "hpgl"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Unknown output target: hpgl"));
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let output = viamill()
        .arg(dir.path().join("missing.json"))
        .output()
        .unwrap();
    assert!(!output.status.success());
}
