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

use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no value was posted in {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("worker dropped its side of the channel without posting a value")]
    WorkerGone,

    #[error("result slot already holds a value")]
    Full,

    #[error("orchestrator side of the channel is closed")]
    Closed,
}

impl ChannelError {
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }
}
