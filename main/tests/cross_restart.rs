/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

const CFH: &str = env!("CARGO_BIN_EXE_cfh");
const FAULT_EXIT_CODE: i32 = 3;

const CACHE_FAULT_TEST: &str = "invalid_access_to_cache_raises_panic_on_first_core";
const BUS_GATE_TEST: &str = "invalid_access_through_closed_bus_gates";

fn write_config(dir: &Path) -> PathBuf {
    let config = r#"
target = "esp32"
state.path = "state"

[harness]
fault-grace-period-ms = 5000
worker-priority = "normal"

[simulation]
watchdog-timeout-ms = 100

[logs]
log-level = "debug"
"#;
    let path = dir.join("config.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn cfh(config: &Path, args: &[&str]) -> Output {
    Command::new(CFH)
        .arg("--config-path")
        .arg(config)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn restart_reason(config: &Path) -> serde_json::Value {
    let output = cfh(config, &["restart-reason"]);
    assert!(output.status.success());
    serde_json::from_str(stdout(&output).trim()).unwrap()
}

#[test]
fn list_prints_every_test() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = cfh(&config, &["list"]);
    assert!(output.status.success());

    let cases = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(cases.len(), 4);
    assert_eq!(cases[1]["name"], CACHE_FAULT_TEST);
    assert_eq!(cases[1]["expected_reset"], "Cache disabled,SW_RESET");
    assert_eq!(cases[3]["expected_reset"], "Cache disabled,SW_RESET");
}

#[test]
fn cache_state_query_passes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = cfh(&config, &["run", "cache_enabled_query_works_on_all_cores"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("passed"));
}

#[test]
fn cache_fault_is_verified_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());
    assert_eq!(restart_reason(&config)["cause"], "power-on");

    let first_launch = cfh(&config, &["run", CACHE_FAULT_TEST]);
    assert_eq!(first_launch.status.code(), Some(FAULT_EXIT_CODE));

    let marker = std::fs::read(dir.path().join("state").join("stage.json")).unwrap();
    let marker: serde_json::Value = serde_json::from_slice(&marker).unwrap();
    assert_eq!(marker["test_name"], CACHE_FAULT_TEST);
    assert_eq!(marker["next_stage"], 1);

    let relaunch = cfh(&config, &["run", CACHE_FAULT_TEST]);
    assert!(relaunch.status.success(), "{}", stdout(&relaunch));
    assert!(stdout(&relaunch).contains("passed"));
    assert!(!dir.path().join("state").join("stage.json").exists());

    // the restart record is consumed by the boot that saw it
    assert_eq!(restart_reason(&config)["cause"], "power-on");
}

#[test]
fn read_only_commands_keep_restart_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let first_launch = cfh(&config, &["run", CACHE_FAULT_TEST]);
    assert_eq!(first_launch.status.code(), Some(FAULT_EXIT_CODE));

    let record = restart_reason(&config);
    assert_eq!(record["cause"], "panic");
    assert_eq!(record["origin_core"], 0);
    assert!(cfh(&config, &["list"]).status.success());
    assert_eq!(restart_reason(&config)["cause"], "panic");

    let relaunch = cfh(&config, &["run", CACHE_FAULT_TEST]);
    assert!(relaunch.status.success(), "{}", stdout(&relaunch));
    assert!(stdout(&relaunch).contains("passed"));
}

#[test]
fn bus_gate_fault_is_verified_as_watchdog() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let first_launch = cfh(&config, &["run", BUS_GATE_TEST]);
    assert_eq!(first_launch.status.code(), Some(FAULT_EXIT_CODE));

    let record = std::fs::read(dir.path().join("state").join("pending_restart.json")).unwrap();
    let record: serde_json::Value = serde_json::from_slice(&record).unwrap();
    assert_eq!(record["cause"], "watchdog");

    let relaunch = cfh(&config, &["run", BUS_GATE_TEST]);
    assert!(relaunch.status.success(), "{}", stdout(&relaunch));
}

#[test]
fn verification_without_restart_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = cfh(&config, &["run", CACHE_FAULT_TEST, "--stage", "1"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("power-on"));
}

#[test]
fn unknown_stage_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path());

    let output = cfh(&config, &["run", CACHE_FAULT_TEST, "--stage", "7"]);
    assert_eq!(output.status.code(), Some(1));
}
