use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn climate_fixture() -> PathBuf {
    let fixture = repo_root()
        .join("fixtures")
        .join("maps")
        .join("climate.json");
    assert!(fixture.exists(), "fixture missing: {}", fixture.display());
    fixture
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
    let reader = decoder.read_info().expect("png header");
    let info = reader.info();
    (info.width, info.height)
}

#[test]
fn cli_renders_svg_to_stdout() {
    let exe = assert_cmd::cargo_bin!("sprig-cli");
    let output = Command::new(exe)
        .args([
            "render",
            "--selected",
            "1718000000003-a",
            climate_fixture().to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let svg = String::from_utf8(output.stdout).expect("utf8");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
    assert_eq!(svg.matches(r##"fill="#3b82f6""##).count(), 1);
    assert!(svg.contains("Storage &amp; Grids"));
}

#[test]
fn cli_renders_png_with_default_out_path_for_file_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let tmp_fixture = tmp.path().join("climate.json");
    fs::copy(climate_fixture(), &tmp_fixture).expect("copy fixture");
    let expected_out = tmp_fixture.with_extension("png");

    let exe = assert_cmd::cargo_bin!("sprig-cli");
    Command::new(exe)
        .args([
            "render",
            "--format",
            "png",
            "--viewport-width",
            "400",
            "--viewport-height",
            "300",
            tmp_fixture.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&expected_out).expect("read png");
    assert!(bytes.starts_with(PNG_SIGNATURE), "output is not a PNG");
    assert_eq!(png_size(&bytes), (800, 600));
}

#[test]
fn cli_layout_json_reports_positions() {
    let exe = assert_cmd::cargo_bin!("sprig-cli");
    let output = Command::new(exe)
        .args([
            "render",
            "--format",
            "json",
            climate_fixture().to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v["layout"]["nodes"].as_array().unwrap().len(), 9);
    assert_eq!(v["layout"]["links"].as_array().unwrap().len(), 8);
    assert_eq!(v["transform"]["k"], 0.8);
}

#[test]
fn cli_rejects_invalid_map() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, r#"{"foo": 1}"#).expect("write");

    let exe = assert_cmd::cargo_bin!("sprig-cli");
    let output = Command::new(exe)
        .args(["render", bad.to_string_lossy().as_ref()])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid JSON file format"), "{stderr}");
}

#[test]
fn cli_unknown_flag_is_usage_error() {
    let exe = assert_cmd::cargo_bin!("sprig-cli");
    Command::new(exe)
        .args(["render", "--bogus"])
        .assert()
        .code(2);
}

#[test]
fn cli_edit_script_runs_session() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let json_out = tmp.path().join("map.json");
    let png_out = tmp.path().join("map.png");
    let svg_out = tmp.path().join("map.svg");
    let script = tmp.path().join("session.txt");
    fs::write(
        &script,
        format!(
            "# build a small map\n\
             start Climate Change\n\
             select root\n\
             accept 2\n\
             add root Policy\n\
             undo\n\
             redo\n\
             add missing Orphan\n\
             show\n\
             status\n\
             export json {}\n\
             export png {}\n\
             zoom 2\n\
             pan 10 -5\n\
             export svg {}\n",
            json_out.display(),
            png_out.display(),
            svg_out.display()
        ),
    )
    .expect("write script");

    let exe = assert_cmd::cargo_bin!("sprig-cli");
    let output = Command::new(exe)
        .args([
            "edit",
            "--deterministic-ids",
            "--suggestions",
            "Sea Levels, Renewables ,,Policy",
            script.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("1. Sea Levels\n2. Renewables\n3. Policy\n"), "{stdout}");
    assert!(stdout.contains("added n1\n"), "{stdout}");
    assert!(stdout.contains("- Climate Change [root]\n"), "{stdout}");
    assert!(stdout.contains("  - Renewables [n1]"), "{stdout}");
    assert!(stdout.contains("history 3/3"), "{stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("line 8: Parent node not found: missing"),
        "{stderr}"
    );
    assert!(stderr.contains("1 script line failed"), "{stderr}");

    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_out).expect("json export")).unwrap();
    let names: Vec<&str> = exported["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Renewables", "Policy"]);

    let bytes = fs::read(&png_out).expect("png export");
    assert!(bytes.starts_with(PNG_SIGNATURE));
    assert_eq!(png_size(&bytes), (1600, 1200));

    let view = stdout
        .lines()
        .filter_map(|l| l.strip_prefix("view "))
        .last()
        .expect("view line");
    assert!(view.ends_with("scale(1.6)"), "{view}");
    let svg = fs::read_to_string(&svg_out).expect("svg export");
    assert!(
        svg.contains(&format!(r#"<g class="viewport" transform="{view}">"#)),
        "{svg}"
    );
}

#[test]
fn cli_edit_script_without_errors_exits_zero() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("session.txt");
    fs::write(&script, "start Topic\nadd root Child\nshow\n").expect("write script");

    let exe = assert_cmd::cargo_bin!("sprig-cli");
    Command::new(exe)
        .args([
            "edit",
            "--deterministic-ids",
            script.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();
}
