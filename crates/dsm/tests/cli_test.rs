use std::process::Command;

use tempfile::TempDir;

/// Initialises a tiny local git repository so the CLI can exercise the
/// real `GitFetcher` over a `file://` URL without reaching the network —
/// same pattern `dsm-fetch`'s own unit tests use.
fn init_local_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let path = dir.path();
    let run = |args: &[&str]| {
        Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .expect("git available in test environment")
    };
    run(&["init", "-q"]);
    run(&["config", "user.email", "test@test.com"]);
    run(&["config", "user.name", "Test User"]);
    std::fs::write(
        path.join("main.go"),
        "package main\nimport \"fmt\"\nfunc main() { fmt.Println(\"hi\") }\n",
    )
    .unwrap();
    run(&["add", "main.go"]);
    run(&["commit", "-q", "-m", "initial"]);
    dir
}

#[test]
fn analyze_text_output_reports_branch_and_file() {
    let repo = init_local_repo();
    let url = format!("file://{}", repo.path().display());

    let output = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args(["analyze", &url, "--quiet"])
        .output()
        .expect("failed to run dsm analyze");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "dsm analyze failed: stdout={stdout}, stderr={stderr}"
    );
    assert!(stdout.contains("main.go"), "stdout={stdout}");
}

#[test]
fn analyze_json_output_is_valid_and_matches_shape() {
    let repo = init_local_repo();
    let url = format!("file://{}", repo.path().display());

    let output = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args(["analyze", &url, "--format", "json", "--compact", "--quiet"])
        .output()
        .expect("failed to run dsm analyze");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("stdout should be valid JSON");
    assert!(parsed.get("files").is_some());
    assert!(parsed.get("display_items").is_some());
    assert!(parsed.get("file_list").is_some());
    assert!(parsed.get("branch").is_some());
    assert_eq!(parsed["file_list"][0], "main.go");
}

#[test]
fn analyze_unreachable_url_fails_with_exit_code_two() {
    let output = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args(["analyze", "file:///nonexistent/path/to/repo", "--quiet"])
        .output()
        .expect("failed to run dsm analyze");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn init_writes_default_config_and_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run dsm init");
    assert!(output.status.success());
    assert!(dir.path().join("dsm.toml").exists());

    let second = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run dsm init");
    assert_eq!(second.status.code(), Some(2));
}

#[test]
fn analyze_respects_explicit_config_file() {
    let repo = init_local_repo();
    let url = format!("file://{}", repo.path().display());
    let config_dir = TempDir::new().unwrap();
    let config_path = config_dir.path().join("custom.toml");
    std::fs::write(
        &config_path,
        "[pipeline]\ninclude_tests = true\nlarge_repo_threshold = 5\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dsm"))
        .args([
            "analyze",
            &url,
            "--config",
            config_path.to_str().unwrap(),
            "--quiet",
        ])
        .output()
        .expect("failed to run dsm analyze");

    assert!(output.status.success());
}
