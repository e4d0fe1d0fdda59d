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

use async_trait::async_trait;
use cfh_cache_control::AccessGate;
use cfh_cache_control::CCResult;
use cfh_cache_control::CacheControl;
use cfh_cache_control::CachedRegion;
use cfh_cache_control::GateId;
use cfh_cache_control::GuardedMemory;
use cfh_cache_control::RegionError;

use super::CoreSlot;
use super::Stage;
use super::StageCompletion;
use super::StageContext;
use super::StageResult;
use crate::channel;
use crate::channel::ChannelError;
use crate::LogicalCoreId;
use crate::TestFailure;

const CLOSED_GATES: [GateId; 2] = [GateId::Flash, GateId::Psram];

/// What a fault worker managed to observe, it's only ever reported if the fault didn't happen.
#[derive(Copy, Clone, Debug)]
struct ProbeReport {
    first_word: u32,
    second_word: u32,
    cache_enabled: Option<bool>,
}

/// Reads cache-backed memory on a core with disabled cache guards,
/// the platform is expected to restart the process.
#[derive(Clone, Debug)]
pub struct CacheFaultStage {
    core: CoreSlot,
}

/// Reads cache-backed memory with closed flash and psram bus gates,
/// the access stalls until the watchdog restarts the process.
#[derive(Clone, Debug)]
pub struct BusGateFaultStage {
    core: CoreSlot,
}

impl CacheFaultStage {
    pub fn new(core: CoreSlot) -> Self {
        Self { core }
    }
}

impl BusGateFaultStage {
    pub fn new(core: CoreSlot) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Stage for CacheFaultStage {
    fn name(&self) -> &str {
        "access_cache_with_disabled_guards"
    }

    fn completion(&self) -> StageCompletion {
        StageCompletion::Restarts
    }

    async fn run(&self, context: &StageContext) -> StageResult {
        let core_id = self.core.resolve(&context.cores)?;
        let memory = guarded_memory(context)?;
        let region = guarded_region(memory.as_ref())?;
        let cache = context.platform.cache().clone();

        launch_probe(context, core_id, "cache-fault", move |core_id| {
            read_with_disabled_guards(cache.as_ref(), memory.as_ref(), &region, core_id)
        })
        .await
    }
}

#[async_trait]
impl Stage for BusGateFaultStage {
    fn name(&self) -> &str {
        "access_cache_with_closed_bus_gates"
    }

    fn completion(&self) -> StageCompletion {
        StageCompletion::Restarts
    }

    async fn run(&self, context: &StageContext) -> StageResult {
        let core_id = self.core.resolve(&context.cores)?;
        let memory = guarded_memory(context)?;
        let region = guarded_region(memory.as_ref())?;
        let gate = context
            .platform
            .gate()
            .cloned()
            .ok_or(TestFailure::MissingAdapter("bus access gates"))?;

        launch_probe(context, core_id, "bus-gate-fault", move |_| {
            read_with_closed_gates(gate.as_ref(), memory.as_ref(), &region)
        })
        .await
    }
}

fn guarded_memory(context: &StageContext) -> Result<Arc<dyn GuardedMemory>, TestFailure> {
    context
        .platform
        .memory()
        .cloned()
        .ok_or(TestFailure::MissingAdapter("guarded memory access"))
}

fn guarded_region(memory: &dyn GuardedMemory) -> Result<CachedRegion, TestFailure> {
    let region = CachedRegion::guarded_rodata(memory.cache_line_size())?;
    if !memory.is_cache_backed(&region) {
        return Err(RegionError::NotCacheBacked {
            address: region.address(),
        }
        .into());
    }

    Ok(region)
}

/// Launches the probe and waits for the fault grace period, returning means the process
/// is still alive, the orchestrator decides what that means.
async fn launch_probe<F>(
    context: &StageContext,
    core_id: LogicalCoreId,
    name: &str,
    probe: F,
) -> StageResult
where
    F: FnOnce(LogicalCoreId) -> CCResult<ProbeReport> + Send + 'static,
{
    let (inlet, mut outlet) = channel::channel();
    let worker = context
        .launcher
        .launch(context.launch_params(core_id, name), move |core_id| {
            let report = probe(core_id);
            // nobody might be listening anymore
            let _ = inlet.send(report);
        })
        .await?;

    log::info!(
        "fault probe launched on core {}, waiting {:?} for the restart",
        worker.core_id(),
        context.fault_grace_period
    );

    match outlet.receive(context.fault_grace_period).await {
        Ok(Ok(report)) => {
            log::warn!(
                "fault probe on core {core_id} survived: read {:#x} and {:#x}, cache enabled = {:?}",
                report.first_word,
                report.second_word,
                report.cache_enabled
            );
            Ok(())
        }
        Ok(Err(e)) => Err(TestFailure::worker_failed(core_id, e)),
        Err(ChannelError::Timeout { .. }) => {
            log::warn!("fault probe on core {core_id} is still blocked after the grace period");
            Ok(())
        }
        Err(e) => Err(TestFailure::worker_failed(core_id, e)),
    }
}

fn read_with_disabled_guards(
    cache: &dyn CacheControl,
    memory: &dyn GuardedMemory,
    region: &CachedRegion,
    core_id: LogicalCoreId,
) -> CCResult<ProbeReport> {
    cache.disable_guards(core_id)?;

    let first_word = memory.read_word(region, 0);
    let second_word = memory.read_word(region, 1);
    let cache_enabled = cache.is_enabled(core_id);
    cache.enable_guards(core_id)?;

    Ok(ProbeReport {
        first_word: first_word?,
        second_word: second_word?,
        cache_enabled: Some(cache_enabled?),
    })
}

fn read_with_closed_gates(
    gate: &dyn AccessGate,
    memory: &dyn GuardedMemory,
    region: &CachedRegion,
) -> CCResult<ProbeReport> {
    for gate_id in CLOSED_GATES {
        gate.set_gate(gate_id, false)?;
    }

    let first_word = memory.read_word(region, 0);
    let second_word = memory.read_word(region, 1);

    for gate_id in CLOSED_GATES {
        gate.set_gate(gate_id, true)?;
    }

    Ok(ProbeReport {
        first_word: first_word?,
        second_word: second_word?,
        cache_enabled: None,
    })
}
