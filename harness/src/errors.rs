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

use cfh_cache_control::RegionError;
use cpu_utils::CPUTopologyError;
use thiserror::Error as ThisError;

use crate::state_storage::StorageError;

#[derive(ThisError, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Topology(#[from] CPUTopologyError),

    #[error("guarded region is unusable on this platform: {0}")]
    InvalidRegion(#[from] RegionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unknown test {name}")]
    UnknownTest { name: String },
}

impl HarnessError {
    pub fn unknown_test(name: impl Into<String>) -> Self {
        Self::UnknownTest { name: name.into() }
    }
}
