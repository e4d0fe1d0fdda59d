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
use std::time::Duration;

use eyre::eyre;
use serde::Deserialize;
use serde::Serialize;

use cfh_shared::types::TargetId;
use cfh_shared::RestartCause;
use cpu_utils::priority::WorkerPriority;

use super::defaults::*;
use crate::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedCFHConfig {
    #[serde(default = "default_target")]
    pub target: TargetId,
    #[serde(default)]
    pub platform: UnresolvedPlatform,
    #[serde(default)]
    pub harness: UnresolvedHarness,
    #[serde(default)]
    pub simulation: UnresolvedSimulation,
    #[serde(default)]
    pub targets: Vec<UnresolvedTarget>,
    #[serde(default)]
    pub logs: UnresolvedLogs,
    #[serde(default)]
    pub state: State,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedPlatform {
    #[serde(default)]
    pub kind: UnresolvedPlatformKind,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedPlatformKind {
    #[default]
    Simulated,
    MsrPrefetch,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedHarness {
    #[serde(default)]
    pub cores: Vec<u32>,
    #[serde(default)]
    pub utility_cores: Vec<u32>,
    #[serde(default = "default_report_timeout_ms")]
    pub report_timeout_ms: u64,
    #[serde(default = "default_fault_grace_period_ms")]
    pub fault_grace_period_ms: u64,
    #[serde(default = "default_worker_stack_size")]
    pub worker_stack_size: usize,
    #[serde(default)]
    pub worker_priority: UnresolvedPriority,
}

impl Default for UnresolvedHarness {
    fn default() -> Self {
        Self {
            cores: Vec::new(),
            utility_cores: Vec::new(),
            report_timeout_ms: default_report_timeout_ms(),
            fault_grace_period_ms: default_fault_grace_period_ms(),
            worker_stack_size: default_worker_stack_size(),
            worker_priority: UnresolvedPriority::default(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPriority {
    Normal,
    High,
    #[default]
    Max,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedSimulation {
    #[serde(default = "default_cache_line_size")]
    pub cache_line_size: usize,
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,
}

impl Default for UnresolvedSimulation {
    fn default() -> Self {
        Self {
            cache_line_size: default_cache_line_size(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
        }
    }
}

/// A per-target override of the declared restart expectations,
/// the `default` name overrides the fallback entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedTarget {
    pub name: TargetId,
    pub reset_tag: String,
    pub cache_fault_cause: Option<String>,
    pub bus_gate_fault_cause: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnresolvedLogs {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for UnresolvedLogs {
    fn default() -> Self {
        UnresolvedLogs {
            log_level: default_log_level(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "default_state_path")]
    pub path: std::path::PathBuf,
}

impl Default for State {
    fn default() -> Self {
        State {
            path: default_state_path(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl UnresolvedCFHConfig {
    pub fn resolve(self, config_path: impl AsRef<Path>) -> eyre::Result<CFHConfig> {
        let config_dir = config_path.as_ref().parent().ok_or_else(|| {
            eyre!(
                "config resolver was provided with invalid config path: {}",
                config_path.as_ref().display()
            )
        })?;

        let platform = self.platform.kind.resolve();
        let harness = self.harness.resolve()?;
        let simulation = self.simulation.resolve()?;
        let targets = resolve_targets(self.targets)?;
        let logs = self.logs.resolve();

        // a stalled bus-gate probe must hit the watchdog before the fault stage gives up
        if simulation.watchdog_timeout >= harness.fault_grace_period {
            eyre::bail!(
                "watchdog-timeout-ms ({:?}) should be less than fault-grace-period-ms ({:?})",
                simulation.watchdog_timeout,
                harness.fault_grace_period
            );
        }

        let config = CFHConfig {
            target: self.target,
            platform,
            harness,
            simulation,
            targets,
            logs,
            state_dir: config_dir.join(self.state.path),
        };
        Ok(config)
    }
}

impl UnresolvedPlatformKind {
    pub fn resolve(self) -> PlatformKind {
        match self {
            UnresolvedPlatformKind::Simulated => PlatformKind::Simulated,
            UnresolvedPlatformKind::MsrPrefetch => PlatformKind::MSRPrefetch,
        }
    }
}

impl UnresolvedHarness {
    pub fn resolve(self) -> eyre::Result<Harness> {
        if self.report_timeout_ms == 0 {
            eyre::bail!("report-timeout-ms must be positive, the wait is always bounded");
        }

        let mut cores = self.cores.into_iter().map(Into::into).collect::<Vec<_>>();
        cores.sort();
        cores.dedup();

        let utility_cores = self
            .utility_cores
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>();

        let harness = Harness {
            cores,
            utility_cores,
            report_timeout: Duration::from_millis(self.report_timeout_ms),
            fault_grace_period: Duration::from_millis(self.fault_grace_period_ms),
            worker_stack_size: self.worker_stack_size,
            worker_priority: self.worker_priority.resolve(),
        };
        Ok(harness)
    }
}

impl UnresolvedPriority {
    pub fn resolve(self) -> WorkerPriority {
        match self {
            UnresolvedPriority::Normal => WorkerPriority::Normal,
            UnresolvedPriority::High => WorkerPriority::High,
            UnresolvedPriority::Max => WorkerPriority::Max,
        }
    }
}

impl UnresolvedSimulation {
    pub fn resolve(self) -> eyre::Result<Simulation> {
        if !self.cache_line_size.is_power_of_two() {
            eyre::bail!(
                "cache-line-size should be a power of two, got {}",
                self.cache_line_size
            );
        }

        let simulation = Simulation {
            cache_line_size: self.cache_line_size,
            watchdog_timeout: Duration::from_millis(self.watchdog_timeout_ms),
        };
        Ok(simulation)
    }
}

impl UnresolvedTarget {
    pub fn resolve(self) -> eyre::Result<(TargetId, TargetExpectation)> {
        let mut expectation = TargetExpectation::new(&self.reset_tag);
        if let Some(cause) = self.cache_fault_cause {
            expectation.cache_fault_cause = parse_cause(&cause)?;
        }
        if let Some(cause) = self.bus_gate_fault_cause {
            expectation.bus_gate_fault_cause = parse_cause(&cause)?;
        }

        Ok((self.name, expectation))
    }
}

fn parse_cause(cause: &str) -> eyre::Result<RestartCause> {
    cause
        .parse::<RestartCause>()
        .map_err(|error| eyre!("invalid restart cause in targets table: {error}"))
}

fn resolve_targets(targets: Vec<UnresolvedTarget>) -> eyre::Result<TargetTable> {
    const FALLBACK_TARGET_NAME: &str = "default";

    let mut table = TargetTable::default();
    for target in targets {
        let (name, expectation) = target.resolve()?;
        if name.as_str() == FALLBACK_TARGET_NAME {
            table.set_fallback(expectation);
        } else {
            table.insert(name, expectation);
        }
    }

    Ok(table)
}

impl LogLevel {
    pub fn to_tracing_filter(&self) -> tracing_subscriber::filter::LevelFilter {
        use tracing_subscriber::filter::LevelFilter;

        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl UnresolvedLogs {
    pub fn resolve(self) -> Logs {
        Logs {
            log_level: self.log_level.to_tracing_filter(),
        }
    }
}
