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

use std::path::PathBuf;
use std::time::Duration;

use cfh_shared::types::TargetId;
use cfh_shared::RestartCause;
use cpu_utils::priority::WorkerPriority;

use crate::config_loader::load_config;
use crate::CFHConfig;
use crate::Harness;
use crate::Logs;
use crate::PlatformKind;
use crate::Simulation;
use crate::TargetExpectation;
use crate::TargetTable;

#[test]
fn parse_basic_config() {
    let mut manifest_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_path.push("src/tests/default.toml");

    let actual_config = load_config(manifest_path.as_os_str().to_str().unwrap()).unwrap();

    let harness = Harness {
        cores: vec![0.into(), 1.into()],
        utility_cores: vec![2.into()],
        report_timeout: Duration::from_millis(500),
        fault_grace_period: Duration::from_millis(2000),
        worker_stack_size: 32768,
        worker_priority: WorkerPriority::High,
    };
    let simulation = Simulation {
        cache_line_size: 128,
        watchdog_timeout: Duration::from_millis(150),
    };

    let mut targets = TargetTable::default();
    targets.set_fallback(TargetExpectation {
        reset_tag: "Cache error,SW_CPU".to_string(),
        cache_fault_cause: RestartCause::SoftwareReset,
        bus_gate_fault_cause: RestartCause::Watchdog,
    });

    let logs = Logs {
        log_level: tracing_subscriber::filter::LevelFilter::WARN,
    };
    let expected_config = CFHConfig {
        target: TargetId::new("esp32s3"),
        platform: PlatformKind::Simulated,
        harness,
        simulation,
        targets,
        logs,
        state_dir: manifest_path.parent().unwrap().join("../test"),
    };

    assert_eq!(actual_config, expected_config);
}

#[test]
fn default_table_declares_both_variants_independently() {
    let table = TargetTable::default();

    let esp32 = table.expectation(&TargetId::new("esp32"));
    assert_eq!(esp32.reset_tag, "Cache disabled,SW_RESET");
    assert_eq!(esp32.cache_fault_cause, RestartCause::Panic);
    assert_eq!(esp32.bus_gate_fault_cause, RestartCause::Watchdog);

    let unknown = table.expectation(&TargetId::new("riscv-board"));
    assert_eq!(unknown.reset_tag, "Cache error,SW_CPU");
}

#[test]
fn target_names_are_case_insensitive() {
    let table = TargetTable::default();
    let expectation = table.expectation(&TargetId::new("ESP32S3"));
    assert_eq!(expectation.reset_tag, "Cache disabled,RTC_SW_CPU_RST");
}

#[test]
fn watchdog_must_fire_within_grace_period() {
    let mut manifest_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_path.push("src/tests/slow_watchdog.toml");

    let error = load_config(manifest_path.as_os_str().to_str().unwrap()).unwrap_err();
    assert!(error.to_string().contains("watchdog-timeout-ms"), "{error}");
}
