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

use cfh_shared::types::LogicalCoreId;

#[derive(ThisError, Debug)]
pub enum CacheControlError {
    #[error("cache guards are already disabled by core {holder}, core {core_id} can't open a new bracket")]
    BracketHeld {
        core_id: LogicalCoreId,
        holder: LogicalCoreId,
    },

    #[error("core {core_id} tried to enable cache guards, but the bracket is held by {holder:?}")]
    NotBracketHolder {
        core_id: LogicalCoreId,
        holder: Option<LogicalCoreId>,
    },

    #[error("word {index} is out of region bounds, region has {len} words")]
    OutOfBounds { index: usize, len: usize },

    #[error("cache control isn't supported on this platform: {0}")]
    Unsupported(&'static str),

    #[cfg(all(target_arch = "x86_64", target_os = "linux"))]
    #[error(transparent)]
    MSRError(#[from] crate::msr_impl::MSRError),
}

impl CacheControlError {
    pub fn bracket_held(core_id: LogicalCoreId, holder: LogicalCoreId) -> Self {
        Self::BracketHeld { core_id, holder }
    }

    pub fn not_bracket_holder(core_id: LogicalCoreId, holder: Option<LogicalCoreId>) -> Self {
        Self::NotBracketHolder { core_id, holder }
    }

    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::OutOfBounds { index, len }
    }
}
