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

use std::path::PathBuf;

use cfh_cache_control::Fault;
use cfh_cache_control::FaultHandler;

use super::PENDING_RESTART_FILE;
use crate::storage_utils::save_reliably;

const EXPECT_DEFAULT_SERIALIZER: &str = "the default serde serializer shouldn't fail";

/// Exit code of a process terminated by a platform fault,
/// a runner relaunches the test with the next stage on it.
pub const FAULT_EXIT_CODE: i32 = 3;

/// Persists the restart record of a fault and terminates the process,
/// the next launch picks the record up through `BootRecorder`.
#[derive(Clone, Debug)]
pub struct RebootingFaultHandler {
    state_dir: PathBuf,
}

impl RebootingFaultHandler {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }
}

impl FaultHandler for RebootingFaultHandler {
    fn on_fault(&self, fault: Fault) -> ! {
        let record = fault.restart_record();
        let data = serde_json::to_vec(&record).expect(EXPECT_DEFAULT_SERIALIZER);
        let path = self.state_dir.join(PENDING_RESTART_FILE);

        if let Err(e) = save_reliably(&path, &data) {
            // the next boot will be reported as power-on
            log::error!("failed to persist restart record to {path:?}: {e}");
        }

        log::error!("{fault}, restarting");
        std::process::exit(FAULT_EXIT_CODE)
    }
}
