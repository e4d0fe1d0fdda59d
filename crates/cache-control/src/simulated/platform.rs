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
use std::time::Duration;

use parking_lot::Mutex;

use cfh_shared::types::LogicalCoreId;
use cfh_shared::Capabilities;

use super::bus::BusGates;
use crate::bracket::GuardBracket;
use crate::AccessGate;
use crate::CCResult;
use crate::CacheControl;
use crate::CacheControlError;
use crate::CachedRegion;
use crate::Fault;
use crate::FaultHandler;
use crate::FaultKind;
use crate::GateId;
use crate::GuardedMemory;

const DEFAULT_CACHE_LINE_SIZE: usize = 64;
const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_millis(300);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    pub cache_line_size: usize,
    /// How long an access through a closed gate stalls before the watchdog fires.
    pub watchdog_timeout: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cache_line_size: DEFAULT_CACHE_LINE_SIZE,
            watchdog_timeout: DEFAULT_WATCHDOG_TIMEOUT,
        }
    }
}

/// Software platform: the cache path, bus gates and the set of cache-backed
/// regions are kept in memory, faults are delivered to the fault handler.
pub struct SimulatedPlatform {
    config: SimulationConfig,
    cache: Mutex<GuardBracket>,
    gates: Mutex<BusGates>,
    cached_regions: Mutex<Vec<CachedRegion>>,
    fault_handler: Arc<dyn FaultHandler>,
}

impl SimulatedPlatform {
    pub fn new(config: SimulationConfig, fault_handler: Arc<dyn FaultHandler>) -> Self {
        Self {
            config,
            cache: Mutex::new(GuardBracket::new()),
            gates: Mutex::new(BusGates::new()),
            cached_regions: Mutex::new(Vec::new()),
            fault_handler,
        }
    }

    /// Maps a region into the cache-backed address space.
    pub fn map_cached(&self, region: CachedRegion) {
        tracing::debug!(
            "simulated platform: mapping {} bytes at {:#x} as cache-backed",
            region.size(),
            region.address()
        );
        self.cached_regions.lock().push(region);
    }

    fn fault(&self, kind: FaultKind, address: usize) -> ! {
        let fault = Fault::new(kind, cpu_utils::pinning::current_core(), address);
        tracing::error!("simulated platform: {fault}");
        self.fault_handler.on_fault(fault)
    }
}

impl CacheControl for SimulatedPlatform {
    fn disable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        tracing::debug!("simulated platform: core {core_id} disables cache guards");
        self.cache.lock().disable(core_id)
    }

    fn enable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        tracing::debug!("simulated platform: core {core_id} enables cache guards");
        self.cache.lock().enable(core_id)
    }

    fn is_enabled(&self, _core_id: LogicalCoreId) -> CCResult<bool> {
        Ok(self.cache.lock().is_enabled())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CACHE_QUERY | Capabilities::FAULT_INJECTION | Capabilities::BUS_GATE
    }
}

impl AccessGate for SimulatedPlatform {
    fn set_gate(&self, gate: GateId, open: bool) -> CCResult<()> {
        tracing::debug!(
            "simulated platform: gate {gate:?} (controller {}) open={open}",
            gate.controller_id()
        );
        self.gates.lock().set(gate, open);
        Ok(())
    }

    fn is_gate_open(&self, gate: GateId) -> bool {
        self.gates.lock().is_open(gate)
    }
}

impl GuardedMemory for SimulatedPlatform {
    fn is_cache_backed(&self, region: &CachedRegion) -> bool {
        self.cached_regions
            .lock()
            .iter()
            .any(|mapped| mapped.contains(region))
    }

    fn cache_line_size(&self) -> usize {
        self.config.cache_line_size
    }

    fn read_word(&self, region: &CachedRegion, index: usize) -> CCResult<u32> {
        let word_ptr = region
            .word_ptr(index)
            .ok_or_else(|| CacheControlError::out_of_bounds(index, region.len()))?;
        let address = word_ptr as usize;

        if self.is_cache_backed(region) {
            if !self.cache.lock().is_enabled() {
                self.fault(FaultKind::CacheDisabledAccess, address);
            }

            let gate = BusGates::gate_for(region.backing());
            if !self.gates.lock().is_open(gate) {
                // the access never completes, the watchdog eventually resets the chip
                std::thread::sleep(self.config.watchdog_timeout);
                self.fault(FaultKind::BusStall, address);
            }
        }

        // SAFETY: word_ptr points into a live 'static slice
        let value = unsafe { std::ptr::read_volatile(word_ptr) };
        Ok(value)
    }
}
