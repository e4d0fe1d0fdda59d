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

use cfh_cache_control::Fault;
use cfh_cache_control::FaultHandler;
use parking_lot::Mutex;

/// Records faults and halts the faulted thread forever, like a core stopped by a fault
/// in a process that never gets restarted.
#[derive(Clone, Debug, Default)]
pub struct HaltingFaultHandler {
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl HaltingFaultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().clone()
    }
}

impl FaultHandler for HaltingFaultHandler {
    fn on_fault(&self, fault: Fault) -> ! {
        self.faults.lock().push(fault);
        loop {
            std::thread::park();
        }
    }
}
