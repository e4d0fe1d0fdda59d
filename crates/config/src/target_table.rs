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

use std::collections::HashMap;

use maplit::hashmap;

use cfh_shared::types::TargetId;
use cfh_shared::RestartCause;

/// What a target is declared to report after each fault-injection variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetExpectation {
    /// Routing tag for external runners, e.g. "Cache disabled,SW_RESET".
    pub reset_tag: String,
    pub cache_fault_cause: RestartCause,
    /// Declared separately from the cache variant, currently a watchdog reset
    /// since closing the gates stalls the bus instead of raising a fault.
    pub bus_gate_fault_cause: RestartCause,
}

impl TargetExpectation {
    pub fn new(reset_tag: &str) -> Self {
        Self {
            reset_tag: reset_tag.to_string(),
            cache_fault_cause: RestartCause::Panic,
            bus_gate_fault_cause: RestartCause::Watchdog,
        }
    }
}

/// Declarative mapping from a target to its expected restart causes,
/// targets without an entry fall back to the default expectation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetTable {
    targets: HashMap<TargetId, TargetExpectation>,
    fallback: TargetExpectation,
}

impl TargetTable {
    pub fn new(targets: HashMap<TargetId, TargetExpectation>, fallback: TargetExpectation) -> Self {
        Self { targets, fallback }
    }

    pub fn expectation(&self, target: &TargetId) -> &TargetExpectation {
        self.targets.get(target).unwrap_or(&self.fallback)
    }

    pub fn insert(&mut self, target: TargetId, expectation: TargetExpectation) {
        self.targets.insert(target, expectation);
    }

    pub fn set_fallback(&mut self, expectation: TargetExpectation) {
        self.fallback = expectation;
    }
}

impl Default for TargetTable {
    fn default() -> Self {
        let targets = hashmap! {
            TargetId::new("esp32") => TargetExpectation::new("Cache disabled,SW_RESET"),
            TargetId::new("esp32c2") => TargetExpectation::new("Cache error,RTC_SW_CPU_RST"),
            TargetId::new("esp32c3") => TargetExpectation::new("Cache error,RTC_SW_CPU_RST"),
            TargetId::new("esp32p4") => TargetExpectation::new("Cache error,RTC_SW_CPU_RST"),
            TargetId::new("esp32s3") => TargetExpectation::new("Cache disabled,RTC_SW_CPU_RST"),
        };

        Self::new(targets, TargetExpectation::new("Cache error,SW_CPU"))
    }
}
