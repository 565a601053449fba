use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("pulselink-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

const SMALL_BOARD: &str = r#"
schema_version: "1.0"
name: small-board
clocks:
  core_hz: 100000
  timer_hz: 100000
sweep:
  max_percent: 20
  step_delay_ms: 10
"#;

#[test]
fn test_cli_help_names_tool() {
    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .arg("--help")
        .output()
        .expect("Failed to execute pulselink");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PulseLink"));
    assert!(stdout.contains("--duration-ms"));
}

#[test]
fn test_cli_json_report() {
    let config = write_temp_file("json-report", SMALL_BOARD);

    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--duration-ms",
            "50",
            "--json",
        ])
        .output()
        .expect("Failed to execute pulselink");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["name"], "small-board");
    assert_eq!(report["config_hash"].as_str().unwrap().len(), 64);
    assert_eq!(report["elapsed_ms"], 50);
    assert_eq!(report["sweep"], true);
    assert_eq!(report["interrupts"]["systick"], 50);
    assert_eq!(report["snapshot"]["pwm"]["period_top"], 100);
    assert_eq!(report["snapshot"]["sweep"]["percent"], 5);
    assert_eq!(report["snapshot"]["sweep"]["max"], 20);

    // Slave streams its seed back to the master
    let miso: Vec<u64> = report["miso_head"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b.as_u64().unwrap())
        .collect();
    assert_eq!(&miso[..3], &[0xA0, 0xA1, 0xA2]);

    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_cli_no_sweep_holds_initial_duty() {
    let config = write_temp_file("no-sweep", SMALL_BOARD);

    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--duration-ms",
            "20",
            "--no-sweep",
            "--json",
        ])
        .output()
        .expect("Failed to execute pulselink");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["sweep"], false);
    assert_eq!(report["snapshot"]["pwm"]["duty_percent"], 30);
    assert!(report["snapshot"]["sweep"].is_null());

    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_cli_writes_output_file() {
    let config = write_temp_file("output-file", SMALL_BOARD);
    let report_path = config.with_extension("json");
    let _ = std::fs::remove_file(&report_path);

    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .args([
            "--config",
            config.to_str().unwrap(),
            "--duration-ms",
            "10",
            "--output",
            report_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute pulselink");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("small-board"));

    let content = std::fs::read_to_string(&report_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["elapsed_ms"], 10);

    let _ = std::fs::remove_file(&config);
    let _ = std::fs::remove_file(&report_path);
}

#[test]
fn test_cli_rejects_invalid_config() {
    let config = write_temp_file(
        "invalid-duty",
        r#"
schema_version: "1.0"
pwm:
  initial_duty: 150
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .args(["--config", config.to_str().unwrap(), "--duration-ms", "1"])
        .output()
        .expect("Failed to execute pulselink");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("initial_duty"));

    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_cli_rejects_short_seed() {
    let config = write_temp_file(
        "short-seed",
        r#"
schema_version: "1.0"
spi:
  tx_seed: [1, 2, 3]
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_pulselink"))
        .args(["--config", config.to_str().unwrap()])
        .output()
        .expect("Failed to execute pulselink");

    assert!(!output.status.success());

    let _ = std::fs::remove_file(&config);
}
