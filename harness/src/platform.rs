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

use cfh_cache_control::simulated::SimulationConfig;
use cfh_cache_control::AccessGate;
use cfh_cache_control::CacheControl;
use cfh_cache_control::CachedRegion;
use cfh_cache_control::FaultHandler;
use cfh_cache_control::GuardedMemory;
use cfh_cache_control::MSRPrefetchGuard;
use cfh_cache_control::SimulatedPlatform;
use cfh_config::PlatformKind;
use cfh_config::Simulation;
use cfh_shared::Capabilities;

use crate::errors::HarnessError;
use crate::HarnessResult;

/// The adapters a stage drives, any of them except the cache control could be absent
/// on a platform, tests requiring a missing one are skipped.
#[derive(Clone)]
pub struct Platform {
    cache: Arc<dyn CacheControl>,
    gate: Option<Arc<dyn AccessGate>>,
    memory: Option<Arc<dyn GuardedMemory>>,
}

impl Platform {
    pub fn new(
        cache: Arc<dyn CacheControl>,
        gate: Option<Arc<dyn AccessGate>>,
        memory: Option<Arc<dyn GuardedMemory>>,
    ) -> Self {
        Self {
            cache,
            gate,
            memory,
        }
    }

    pub fn from_config(
        kind: PlatformKind,
        simulation: &Simulation,
        fault_handler: Arc<dyn FaultHandler>,
    ) -> HarnessResult<Self> {
        match kind {
            PlatformKind::Simulated => {
                let config = SimulationConfig {
                    cache_line_size: simulation.cache_line_size,
                    watchdog_timeout: simulation.watchdog_timeout,
                };
                Self::simulated(config, fault_handler)
            }
            PlatformKind::MSRPrefetch => {
                let guard = MSRPrefetchGuard::from_os();
                Ok(Self::new(Arc::new(guard), None, None))
            }
        }
    }

    /// Simulated platform with the guarded rodata region mapped as cache-backed.
    pub fn simulated(
        config: SimulationConfig,
        fault_handler: Arc<dyn FaultHandler>,
    ) -> HarnessResult<Self> {
        let region = CachedRegion::guarded_rodata(config.cache_line_size)
            .map_err(HarnessError::InvalidRegion)?;

        let platform = Arc::new(SimulatedPlatform::new(config, fault_handler));
        platform.map_cached(region);

        Ok(Self::new(
            platform.clone(),
            Some(platform.clone()),
            Some(platform),
        ))
    }

    pub fn cache(&self) -> &Arc<dyn CacheControl> {
        &self.cache
    }

    pub fn gate(&self) -> Option<&Arc<dyn AccessGate>> {
        self.gate.as_ref()
    }

    pub fn memory(&self) -> Option<&Arc<dyn GuardedMemory>> {
        self.memory.as_ref()
    }

    /// Capabilities backed by the adapters actually present.
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = self.cache.capabilities();
        if self.memory.is_none() {
            capabilities.remove(Capabilities::FAULT_INJECTION);
        }
        if self.gate.is_none() {
            capabilities.remove(Capabilities::BUS_GATE);
        }

        capabilities
    }
}
