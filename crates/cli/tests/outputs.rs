use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("portblink-tests-{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("PortBlink"));
}

#[test]
fn test_cli_default_run_sequence() {
    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args(["--max-toggles", "5", "--delay", "none"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let writes: Vec<&str> = stdout.lines().collect();
    assert_eq!(writes, ["0xfe", "0xff", "0xfe", "0xff", "0xfe"]);
}

#[test]
fn test_cli_result_json() {
    let dir = temp_dir("result");
    let output_dir = dir.join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args([
            "--max-toggles",
            "6",
            "--delay",
            "none",
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let result_path = output_dir.join("result.json");
    assert!(result_path.exists());
    let content = std::fs::read_to_string(&result_path).unwrap();
    let result: serde_json::Value = serde_json::from_str(&content).unwrap();

    assert_eq!(result["report"]["toggles"], 6);
    assert_eq!(result["report"]["stop_reason"], "max_toggles");
    assert_eq!(result["report"]["last_state"], "high");
    assert_eq!(result["report"]["delay_iterations"], 6 * 7_600_000u64);

    let port_b = &result["ports"]["port_b"];
    assert_eq!(port_b["ddr"], 0xFF);
    assert_eq!(port_b["output"], 0xFF);
    assert_eq!(
        port_b["dr_writes"],
        serde_json::json!([0xFE, 0xFF, 0xFE, 0xFF, 0xFE, 0xFF])
    );
    assert_eq!(port_b["dr_write_count"], 6);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_manifest_with_wall_time() {
    let dir = temp_dir("manifest");
    let manifest_path = dir.join("board.yaml");
    let manifest = r#"
schema_version: "1.0"
board:
  name: h8-3067
  ports:
    - id: port_a
      ddr_address: 0xFEE009
      dr_address: 0xFFFFD9
    - id: port_b
      ddr_address: 0xFEE00A
      dr_address: 0xFFFFDA
  registers:
    - name: syscr
      address: 0xFEE012
      reset: 0x09
  driver_port: port_b
delay:
  strategy: sleep
  iteration_ns: 1
limits:
  wall_time_ms: 100
"#;
    std::fs::write(&manifest_path, manifest).expect("Failed to write manifest");
    let output_dir = dir.join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args([
            "--config",
            manifest_path.to_str().unwrap(),
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let content = std::fs::read_to_string(output_dir.join("result.json")).unwrap();
    let result: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(result["report"]["stop_reason"], "cancelled");
    assert!(result["ports"]["port_a"]["dr_writes"]
        .as_array()
        .unwrap()
        .is_empty());

    assert_eq!(result["registers"]["syscr"]["address"], 0xFE_E012);
    assert_eq!(result["registers"]["syscr"]["value"], 0x09);

    let writes = result["ports"]["port_b"]["dr_writes"].as_array().unwrap();
    assert!(!writes.is_empty());
    assert_eq!(writes[0], 0xFE);
    assert!(writes.windows(2).all(|w| w[0] != w[1]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_wall_time_only_bounds_output() {
    let dir = temp_dir("wall");
    let output_dir = dir.join("artifacts");

    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args([
            "--wall-time-ms",
            "200",
            "--delay",
            "none",
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let printed = stdout.lines().count();
    assert!(printed > 0 && printed <= 64);

    let content = std::fs::read_to_string(output_dir.join("result.json")).unwrap();
    let result: serde_json::Value = serde_json::from_str(&content).unwrap();
    // The default 5-toggle cap must not apply when only a time limit is given.
    assert_eq!(result["report"]["stop_reason"], "cancelled");
    let toggles = result["report"]["toggles"].as_u64().unwrap();
    assert!(toggles > 5);

    let port_b = &result["ports"]["port_b"];
    assert_eq!(port_b["dr_write_count"].as_u64().unwrap(), toggles);
    assert!(port_b["dr_writes"].as_array().unwrap().len() <= 64);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_rejects_bad_manifest() {
    let dir = temp_dir("bad");
    let manifest_path = dir.join("board.yaml");
    let manifest = r#"
schema_version: "1.0"
board:
  name: h8-3067
  ports:
    - id: port_b
      ddr_address: 0xFEE00A
      dr_address: 0xFFFFDA
  driver_port: port_c
limits:
  max_toggles: 2
"#;
    std::fs::write(&manifest_path, manifest).expect("Failed to write manifest");

    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args(["--config", manifest_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("port_c"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_load_missing_manifest() {
    let output = Command::new(env!("CARGO_BIN_EXE_portblink"))
        .args(["--config", "non_existent_manifest.yaml"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
