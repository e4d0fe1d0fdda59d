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

use std::sync::Arc;

use cfh_config::CFHConfig;
use cfh_shared::RestartRecord;
use cpu_utils::CPUTopology;

use crate::errors::HarnessError;
use crate::launcher::WorkerLauncher;
use crate::registry::TestRegistry;
use crate::restart::BootRecord;
use crate::restart::RebootingFaultHandler;
use crate::stage::StageContext;
use crate::state_storage::StageMarkerStorage;
use crate::HarnessResult;
use crate::Platform;
use crate::StageOrchestrator;
use crate::TestOutcome;

/// Everything needed to run built-in tests, assembled from the config at boot.
pub struct CacheFaultHarness {
    orchestrator: StageOrchestrator,
    registry: TestRegistry,
}

impl CacheFaultHarness {
    /// `boot` is the restart record of this process, taken by the caller with
    /// `BootRecorder::on_boot` or `BootRecorder::inspect`.
    pub fn from_config(config: CFHConfig, boot: BootRecord) -> HarnessResult<Self> {
        let state_dir = config.state_dir.clone();

        let topology = CPUTopology::new()?;
        let cores = if config.harness.cores.is_empty() {
            topology.logical_cores().clone()
        } else {
            for &core_id in config.harness.cores.iter() {
                topology.ensure_available(core_id)?;
            }
            CPUTopology::from_cores(config.harness.cores.clone())?
                .logical_cores()
                .clone()
        };

        let fault_handler = Arc::new(RebootingFaultHandler::new(state_dir.clone()));
        let platform = Platform::from_config(config.platform, &config.simulation, fault_handler)?;

        let expectation = config.targets.expectation(&config.target).clone();
        let registry = TestRegistry::builtin(&expectation);

        let context = StageContext {
            platform,
            launcher: WorkerLauncher::new(topology),
            oracle: Box::new(boot),
            cores,
            target: config.target,
            expectation,
            report_timeout: config.harness.report_timeout,
            fault_grace_period: config.harness.fault_grace_period,
            worker_stack_size: config.harness.worker_stack_size,
            worker_priority: config.harness.worker_priority,
        };
        let orchestrator = StageOrchestrator::new(context, StageMarkerStorage::new(state_dir));

        Ok(Self {
            orchestrator,
            registry,
        })
    }

    pub fn registry(&self) -> &TestRegistry {
        &self.registry
    }

    pub fn last_restart(&self) -> &RestartRecord {
        self.orchestrator.context().oracle.last_restart()
    }

    pub async fn run_test(
        &self,
        name: &str,
        stage_override: Option<usize>,
    ) -> HarnessResult<TestOutcome> {
        let test = self
            .registry
            .get(name)
            .ok_or_else(|| HarnessError::unknown_test(name))?;

        Ok(self.orchestrator.run(test, stage_override).await)
    }
}
