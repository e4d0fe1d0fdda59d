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

use std::time::Duration;

use cfh_shared::types::LogicalCoreId;
use cfh_shared::types::TargetId;
use cpu_utils::priority::WorkerPriority;

use crate::defaults::*;
use crate::TargetTable;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CFHConfig {
    pub target: TargetId,
    pub platform: PlatformKind,
    pub harness: Harness,
    pub simulation: Simulation,
    pub targets: TargetTable,
    pub logs: Logs,
    pub state_dir: std::path::PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlatformKind {
    /// Software cache and bus gates with a fault handler restarting the process.
    #[default]
    Simulated,
    /// Hardware prefetchers controlled via MSR registers, no fault injection.
    MSRPrefetch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Harness {
    /// Cores to run pinned workers on, empty means all cores reported by OS.
    pub cores: Vec<LogicalCoreId>,
    /// Cores the orchestrating runtime threads are pinned to, empty means no pinning.
    pub utility_cores: Vec<LogicalCoreId>,
    /// Bounded wait for a worker report.
    pub report_timeout: Duration,
    /// How long a fault stage waits for the restart before declaring the fault missing.
    pub fault_grace_period: Duration,
    pub worker_stack_size: usize,
    pub worker_priority: WorkerPriority,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Simulation {
    pub cache_line_size: usize,
    pub watchdog_timeout: Duration,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Logs {
    pub log_level: tracing_subscriber::filter::LevelFilter,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            cores: Vec::new(),
            utility_cores: Vec::new(),
            report_timeout: Duration::from_millis(default_report_timeout_ms()),
            fault_grace_period: Duration::from_millis(default_fault_grace_period_ms()),
            worker_stack_size: default_worker_stack_size(),
            worker_priority: WorkerPriority::Max,
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            cache_line_size: default_cache_line_size(),
            watchdog_timeout: Duration::from_millis(default_watchdog_timeout_ms()),
        }
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_tracing_filter(),
        }
    }
}

impl CFHConfig {
    /// Config used when no file is supplied: simulated platform, host target.
    pub fn with_state_dir(state_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            target: default_target(),
            platform: PlatformKind::default(),
            harness: Harness::default(),
            simulation: Simulation::default(),
            targets: TargetTable::default(),
            logs: Logs::default(),
            state_dir: state_dir.into(),
        }
    }
}
