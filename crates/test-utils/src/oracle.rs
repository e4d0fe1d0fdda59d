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
use cfh_shared::RestartOracle;
use cfh_shared::RestartRecord;

/// Restart oracle answering with a predefined record.
#[derive(Clone, Debug)]
pub struct FixedRestartOracle {
    record: RestartRecord,
}

impl FixedRestartOracle {
    pub fn new(record: RestartRecord) -> Self {
        Self { record }
    }

    pub fn after_fault(cause: RestartCause, origin_core: Option<LogicalCoreId>) -> Self {
        Self::new(RestartRecord::fault(cause, "test fault", origin_core))
    }

    pub fn power_on() -> Self {
        Self::new(RestartRecord::power_on())
    }
}

impl RestartOracle for FixedRestartOracle {
    fn last_restart(&self) -> &RestartRecord {
        &self.record
    }
}
