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

use cpu_utils::CPUTopologyError;
use cpu_utils::LogicalCoreId;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    CoreNotAvailable(#[from] CPUTopologyError),

    #[error("failed to spawn a worker thread: {0}")]
    SpawnFailed(std::io::Error),

    #[error("failed to pin a worker thread to core {core_id}")]
    PinningFailed { core_id: LogicalCoreId },

    #[error("worker thread on core {core_id} exited abnormally")]
    WorkerDied { core_id: LogicalCoreId },
}

impl LaunchError {
    pub fn spawn_failed(error: std::io::Error) -> Self {
        Self::SpawnFailed(error)
    }
}
