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

//! Units of a test case, exactly one stage of a test runs per process lifetime.

mod cache_fault;
mod cache_state;
mod verification;

use std::time::Duration;

use async_trait::async_trait;
use cfh_config::TargetExpectation;
use cpu_utils::priority::WorkerPriority;
use nonempty::NonEmpty;

pub use cache_fault::BusGateFaultStage;
pub use cache_fault::CacheFaultStage;
pub use cache_state::CacheStateStage;
pub use verification::FaultVariant;
pub use verification::RestartVerificationStage;

use crate::launcher::LaunchParams;
use crate::launcher::WorkerLauncher;
use crate::restart::RestartOracle;
use crate::LogicalCoreId;
use crate::Platform;
use crate::TargetId;
use crate::TestFailure;

pub type StageResult = Result<(), TestFailure>;

/// How a stage is expected to end.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageCompletion {
    /// The stage returns normally and its result is the test outcome.
    Returns,
    /// The stage is expected to restart the process, returning means the fault didn't happen.
    Restarts,
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn completion(&self) -> StageCompletion;

    async fn run(&self, context: &StageContext) -> StageResult;
}

/// Everything a stage needs from the environment.
pub struct StageContext {
    pub platform: Platform,
    pub launcher: WorkerLauncher,
    pub oracle: Box<dyn RestartOracle>,
    /// Cores workers are pinned to, ascending.
    pub cores: NonEmpty<LogicalCoreId>,
    pub target: TargetId,
    pub expectation: TargetExpectation,
    pub report_timeout: Duration,
    pub fault_grace_period: Duration,
    pub worker_stack_size: usize,
    pub worker_priority: WorkerPriority,
}

impl StageContext {
    pub fn launch_params(&self, core_id: LogicalCoreId, name: &str) -> LaunchParams {
        LaunchParams {
            core_id,
            priority: self.worker_priority,
            stack_size: self.worker_stack_size,
            name: format!("{name}-{core_id}"),
        }
    }
}

/// Position of a core in the configured core set, e.g. the second configured core.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoreSlot(pub usize);

impl CoreSlot {
    pub fn resolve(&self, cores: &NonEmpty<LogicalCoreId>) -> Result<LogicalCoreId, TestFailure> {
        cores
            .get(self.0)
            .copied()
            .ok_or(TestFailure::CoreNotConfigured {
                index: self.0,
                available: cores.len(),
            })
    }
}
