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

use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;

bitflags! {
    /// Features a platform adapter provides, test cases declare the subset they require.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u32 {
        /// Cache enablement can be queried and toggled from a pinned context.
        const CACHE_QUERY = 0b0001;
        /// Accessing cache-backed memory with disabled guards faults and restarts.
        const FAULT_INJECTION = 0b0010;
        /// Bus access gates could be closed independently of the cache.
        const BUS_GATE = 0b0100;
        /// More than one logical core is available for pinning.
        const MULTI_CORE = 0b1000;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

impl Capabilities {
    /// Returns the required capabilities absent from self.
    pub fn missing(&self, required: Capabilities) -> Capabilities {
        required.difference(*self)
    }
}
