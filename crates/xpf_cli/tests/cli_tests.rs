//! End-to-end tests for the `xpf` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn xpf(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xpf"))
        .args(args)
        .current_dir(dir)
        .env_remove("XPF_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_request(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_generate_writes_manifests() {
    let temp = TempDir::new().unwrap();
    write_request(
        temp.path(),
        "cluster.yaml",
        "resource_type: eks\nname: data-platform\nenvironment: production\nregion: us-west-2\nnodeCount: 5\n",
    );

    let output = xpf(temp.path(), &["generate", "--file", "cluster.yaml", "--output", "out"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let cluster = temp
        .path()
        .join("out/crossplane/production/data-platform-cluster.yaml");
    let body = fs::read_to_string(cluster).unwrap();
    assert!(body.starts_with("# Generated by xpFactory"));
    assert!(temp
        .path()
        .join("out/crossplane/production/data-platform-node-group.yaml")
        .exists());
}

#[test]
fn test_generate_dry_run_prints_stream() {
    let temp = TempDir::new().unwrap();
    write_request(
        temp.path(),
        "stack.yaml",
        "- type: vpc\n  name: shop-net\n- type: s3\n  name: shop-assets\n",
    );

    let output = xpf(temp.path(), &["generate", "--file", "stack.yaml", "--dry-run"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kind: VPC"));
    assert!(stdout.contains("kind: Bucket"));
    assert!(stdout.contains("---\n"));
    assert!(!temp.path().join("crossplane").exists());
}

#[test]
fn test_generate_json_dry_run() {
    let temp = TempDir::new().unwrap();
    write_request(temp.path(), "bucket.json", r#"{"type": "s3", "name": "logs"}"#);

    let output = xpf(temp.path(), &["generate", "--file", "bucket.json", "--dry-run", "--json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summaries"][0]["name"], "logs");
}

#[test]
fn test_invalid_request_exit_code() {
    let temp = TempDir::new().unwrap();
    write_request(temp.path(), "db.yaml", "type: rds\nname: orders\nengine: oracle\n");

    let output = xpf(temp.path(), &["generate", "--file", "db.yaml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("engine"));
}

#[test]
fn test_missing_file_exit_code() {
    let temp = TempDir::new().unwrap();
    let output = xpf(temp.path(), &["validate", "--file", "nope.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_validate_prints_descriptor() {
    let temp = TempDir::new().unwrap();
    write_request(temp.path(), "net.yaml", "type: vpc\nname: net1\ncidrBlock: 10.2.0.0/16\n");

    let output = xpf(temp.path(), &["validate", "--file", "net.yaml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("10.2.0.0/16"));
}

#[test]
fn test_policy_for_one_environment() {
    let temp = TempDir::new().unwrap();
    let output = xpf(temp.path(), &["policy", "--environment", "prod"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("environment: production"));
    assert!(!stdout.contains("environment: dev"));

    let bad = xpf(temp.path(), &["policy", "--environment", "moon"]);
    assert_eq!(bad.status.code(), Some(2));
}

#[test]
fn test_project_config_prefix() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".xpf")).unwrap();
    fs::write(
        temp.path().join(".xpf/config.yaml"),
        "output_dir: gitops\npath_prefix: manifests\n",
    )
    .unwrap();
    write_request(temp.path(), "bucket.yaml", "type: s3\nname: assets\n");

    let output = xpf(temp.path(), &["generate", "--file", "bucket.yaml"]);
    assert!(output.status.success());
    assert!(temp
        .path()
        .join("gitops/manifests/dev/assets-bucket.yaml")
        .exists());
}
