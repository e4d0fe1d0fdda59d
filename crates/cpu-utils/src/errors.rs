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

use thiserror::Error as ThisError;

use crate::LogicalCoreId;

#[derive(Debug, ThisError)]
pub enum CPUTopologyError {
    #[error("OS didn't report any logical core available to this process")]
    LogicalCoresNotFound,

    #[error("logical core with {core_id} id not found among {available} available cores")]
    LogicalCoreNotFound {
        core_id: LogicalCoreId,
        available: usize,
    },
}

impl CPUTopologyError {
    pub fn logical_core_not_found(core_id: LogicalCoreId, available: usize) -> Self {
        Self::LogicalCoreNotFound { core_id, available }
    }
}
