use std::process::Command;

use rstest::*;

fn pcd_export() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pcd_export"))
}

#[rstest]
#[case("cube.ply", "x,y,z,nx,ny,nz,red,green,blue,intensity")]
#[case("cube.pcd", "x,y,z,intensity")]
#[case("cube.off", "x,y,z")]
#[case("cube.xyzrgb", "x,y,z,red,green,blue")]
fn test_writes_csv_next_to_input(#[case] name: &str, #[case] header: &str) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join(name);
    std::fs::copy(format!("tests/data/{name}"), &input).unwrap();

    let output = pcd_export().arg(&input).arg("--no-view").output().unwrap();
    assert!(output.status.success(), "{output:?}");

    let csv = std::fs::read_to_string(dir.path().join(format!("{name}.csv"))).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], header);
    assert!(lines[1].starts_with("0.0,0.0,0.0"));

    // Header plus the five default preview rows.
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 6);
}

#[test]
fn test_preview_rows_and_output_flags() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("out.csv");

    let output = pcd_export()
        .args(["tests/data/cube.xyz", "--no-view", "--preview-rows", "2", "-o"])
        .arg(&output_path)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 3);
    assert_eq!(
        std::fs::read_to_string(&output_path).unwrap().lines().count(),
        9
    );
}

#[test]
fn test_missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.ply");

    let output = pcd_export().arg(&input).arg("--no-view").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("File not found"));
    assert!(!dir.path().join("missing.ply.csv").exists());
}

#[test]
fn test_unsupported_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mesh.obj");
    std::fs::write(&input, "v 0 0 0\n").unwrap();

    let output = pcd_export().arg(&input).arg("--no-view").output().unwrap();
    assert!(!output.status.success());
    assert!(!dir.path().join("mesh.obj.csv").exists());
}
