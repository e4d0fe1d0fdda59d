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

use cfh_shared::types::LogicalCoreId;
use cfh_shared::RestartCause;
use cfh_shared::RestartRecord;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Cache-backed memory was accessed while the cache path was disabled.
    CacheDisabledAccess,
    /// An access through a closed bus gate stalled until the watchdog fired.
    BusStall,
}

/// A hardware fault raised by the platform on a particular core.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub core_id: Option<LogicalCoreId>,
    pub address: usize,
}

impl Fault {
    pub fn new(kind: FaultKind, core_id: Option<LogicalCoreId>, address: usize) -> Self {
        Self {
            kind,
            core_id,
            address,
        }
    }

    /// How the platform classifies the restart this fault leads to.
    pub fn restart_cause(&self) -> RestartCause {
        match self.kind {
            FaultKind::CacheDisabledAccess => RestartCause::Panic,
            FaultKind::BusStall => RestartCause::Watchdog,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.kind {
            FaultKind::CacheDisabledAccess => "Cache disabled",
            FaultKind::BusStall => "Bus access stalled",
        }
    }

    pub fn restart_record(&self) -> RestartRecord {
        RestartRecord::fault(self.restart_cause(), self.reason(), self.core_id)
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self
            .core_id
            .map(|core_id| core_id.to_string())
            .unwrap_or_else(|| "unpinned".to_string());
        write!(f, "{} at {:#x} on core {core}", self.reason(), self.address)
    }
}

/// Terminal handler of platform faults, analogue of a panic handler that restarts the chip.
pub trait FaultHandler: Send + Sync {
    fn on_fault(&self, fault: Fault) -> !;
}
