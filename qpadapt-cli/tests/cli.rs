use std::fs;
use std::process::{Command, Output};

fn qpadapt(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qpadapt"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run qpadapt")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("window line is JSON"))
        .collect()
}

#[test]
fn help_lists_subcommands() {
    let output = qpadapt(&["help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("simulate"), "missing simulate in help output");
    assert!(stdout.contains("presets"), "missing presets in help output");
}

#[test]
fn presets_json_lists_both_tiers() {
    let output = qpadapt(&["presets", "--json"]);
    assert!(
        output.status.success(),
        "presets failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["tier"], "sub1080");
    assert_eq!(entries[1]["tier"], "hd1080");
    assert_eq!(entries[1]["preset"]["watermarks"]["ex_high"], 5_000_000);
    assert_eq!(entries[1]["preset"]["spatial_offset"], 2);
}

#[test]
fn short_desktop_run_reports_no_windows() {
    let output = qpadapt(&[
        "simulate", "--width", "640", "--height", "360", "--seconds", "3", "--json",
    ]);
    assert!(output.status.success());
    assert!(json_lines(&output).is_empty());
}

#[test]
fn live_burst_raises_quality_offset() {
    let output = qpadapt(&[
        "simulate",
        "--width",
        "1920",
        "--height",
        "1080",
        "--fps",
        "25",
        "--deployment",
        "live",
        "--profile",
        "121:2.6M,4:14.5M",
        "--json",
    ]);
    assert!(
        output.status.success(),
        "simulate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let windows = json_lines(&output);
    assert!(!windows.is_empty());
    assert!(windows.iter().all(|w| w["armed"] == true));
    assert!(
        windows.iter().any(|w| w["mode"] == "increase_rapidly"),
        "no rapid increase in {windows:?}"
    );
    let last = windows.last().unwrap();
    assert_eq!(last["band"], "high");
    assert!(last["baselines"]["high"].as_i64().unwrap() > 2);
}

#[test]
fn config_file_is_loaded_and_flags_override() {
    let dir = std::env::temp_dir().join(format!("qpadapt_cli_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.json");
    fs::write(
        &path,
        r#"{ "controller": { "width": 0, "height": 720 }, "initial_bitrate": 2000000 }"#,
    )
    .unwrap();

    let bad = qpadapt(&["simulate", "--config", path.to_str().unwrap(), "--seconds", "1"]);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("dimensions"));

    let good = qpadapt(&[
        "simulate",
        "--config",
        path.to_str().unwrap(),
        "--width",
        "1280",
        "--seconds",
        "1",
    ]);
    assert!(
        good.status.success(),
        "simulate failed: {}",
        String::from_utf8_lossy(&good.stderr)
    );
    assert!(String::from_utf8_lossy(&good.stdout).contains("30 frames"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_profile_is_rejected() {
    let output = qpadapt(&["simulate", "--profile", "ten:1M"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("profile"));
}

#[test]
fn unknown_tier_is_a_usage_error() {
    let output = qpadapt(&["simulate", "--tier", "4k"]);
    assert!(!output.status.success());
}
