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

use crate::Backing;
use crate::GateId;

/// Software model of the bus access gates, all gates are open after reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct BusGates {
    flash_open: bool,
    psram_open: bool,
}

impl BusGates {
    pub(crate) fn new() -> Self {
        Self {
            flash_open: true,
            psram_open: true,
        }
    }

    pub(crate) fn set(&mut self, gate: GateId, open: bool) {
        match gate {
            GateId::Flash => self.flash_open = open,
            GateId::Psram => self.psram_open = open,
        }
    }

    pub(crate) fn is_open(&self, gate: GateId) -> bool {
        match gate {
            GateId::Flash => self.flash_open,
            GateId::Psram => self.psram_open,
        }
    }

    pub(crate) fn gate_for(backing: Backing) -> GateId {
        match backing {
            Backing::Flash => GateId::Flash,
            Backing::Psram => GateId::Psram,
        }
    }
}
