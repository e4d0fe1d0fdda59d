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

//! This crate contains adapters over platform primitives that control the cache path
//! and bus access gates. Two adapters are provided: a simulated platform with a software
//! fault injector and, for Linux on x86_64, a guard built on the hardware prefetchers
//! controlled via MSR registers. For everything else the MSR guard is a no-op.

#[cfg(all(target_arch = "x86_64", target_os = "linux"))]
#[path = "linux_x86_64/mod.rs"]
mod msr_impl;
#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
#[path = "other/mod.rs"]
mod msr_impl;

mod bracket;
mod errors;
mod fault;
mod region;
pub mod simulated;

use cfh_shared::types::LogicalCoreId;
use cfh_shared::Capabilities;

pub use errors::CacheControlError;
pub use fault::Fault;
pub use fault::FaultHandler;
pub use fault::FaultKind;
pub use msr_impl::*;
pub use region::Backing;
pub use region::CacheLineAligned;
pub use region::CachedRegion;
pub use region::RegionError;
pub use region::GUARDED_RODATA;
pub use simulated::SimulatedPlatform;

pub type CCResult<T> = Result<T, CacheControlError>;

/// Controls the cache path of the memory subsystem.
/// Callable from any core, a disable/enable bracket is expected to be opened
/// and closed on the same core and only one bracket could be open at a time.
pub trait CacheControl: Send + Sync {
    /// Disables the cache path, opening a bracket held by the core.
    fn disable_guards(&self, core_id: LogicalCoreId) -> CCResult<()>;

    /// Re-enables the cache path, closing the bracket opened by the same core.
    fn enable_guards(&self, core_id: LogicalCoreId) -> CCResult<()>;

    /// Returns true, if the cache path is enabled as seen from the core.
    fn is_enabled(&self, core_id: LogicalCoreId) -> CCResult<bool>;

    fn capabilities(&self) -> Capabilities;
}

/// Identifies a bus access gate, ids follow the memory SPI controller numbering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateId {
    Flash,
    Psram,
}

impl GateId {
    pub fn controller_id(&self) -> u8 {
        match self {
            GateId::Flash => 0,
            GateId::Psram => 2,
        }
    }
}

/// A secondary access-control switch, independent from the cache path.
pub trait AccessGate: Send + Sync {
    fn set_gate(&self, gate: GateId, open: bool) -> CCResult<()>;

    fn is_gate_open(&self, gate: GateId) -> bool;
}

/// Reads cache-backed memory through the platform, a read with disabled guards
/// is handled by the platform fault handler and never returns.
pub trait GuardedMemory: Send + Sync {
    fn is_cache_backed(&self, region: &CachedRegion) -> bool;

    fn cache_line_size(&self) -> usize;

    fn read_word(&self, region: &CachedRegion, index: usize) -> CCResult<u32>;
}
