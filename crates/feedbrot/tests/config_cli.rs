use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn feedbrot(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_feedbrot"))
        .env("FEEDBROT_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run feedbrot")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn config_where_reports_override_dir() {
    let root = TempDir::new().unwrap();
    let output = feedbrot(root.path(), &["config", "where"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    let expected = root.path().join("feedbrot.toml");
    assert!(text.contains(&expected.display().to_string()));
    assert!(text.contains("missing"));

    fs::write(&expected, "").unwrap();
    let output = feedbrot(root.path(), &["config", "where"]);
    assert!(stdout(&output).contains("present"));
}

#[test]
fn config_show_prints_defaults_without_file() {
    let root = TempDir::new().unwrap();
    let output = feedbrot(root.path(), &["config", "show"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("version = 1"));
    assert!(text.contains("width = 1000"));
    assert!(text.contains("max_iterations = 100"));
    assert!(text.contains("recenter = \"per-axis\""));
}

#[test]
fn config_show_merges_file_and_overrides() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("feedbrot.toml"),
        "width = 640\nframe_interval = \"50ms\"\n\n[zoom]\nrecenter = \"shared-x\"\n",
    )
    .unwrap();

    let output = feedbrot(
        root.path(),
        &["--iterations", "42", "config", "show", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("\"width\": 640"));
    assert!(text.contains("\"height\": 1000"));
    assert!(text.contains("\"max_iterations\": 42"));
    assert!(text.contains("\"frame_interval\": \"50ms\""));
    assert!(text.contains("\"recenter\": \"shared-x\""));
}

#[test]
fn unsupported_version_is_rejected() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("feedbrot.toml"), "version = 2\n").unwrap();

    let output = feedbrot(root.path(), &["config", "show"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unsupported config version"));
}

#[test]
fn explicit_config_must_exist() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nope.toml");

    let output = feedbrot(
        root.path(),
        &["--config", missing.to_str().unwrap(), "config", "show"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read config"));
}

#[test]
fn relative_shader_path_follows_config_file() {
    let root = TempDir::new().unwrap();
    let sessions = root.path().join("sessions");
    fs::create_dir_all(&sessions).unwrap();
    let config = sessions.join("deep.toml");
    fs::write(&config, "shader = \"julia.frag\"\n").unwrap();

    let output = feedbrot(
        root.path(),
        &["--config", config.to_str().unwrap(), "config", "show"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let expected = sessions.join("julia.frag");
    assert!(stdout(&output).contains(&expected.display().to_string()));
}

#[test]
fn zero_size_override_is_rejected() {
    let root = TempDir::new().unwrap();
    let output = feedbrot(root.path(), &["--size", "0x10", "config", "show"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("greater than zero"));
}
