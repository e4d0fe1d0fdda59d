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

/// This module is no-op implementation to allow the code to compile on non-x86_64 archs.
use cfh_shared::types::LogicalCoreId;
use cfh_shared::Capabilities;

use crate::CCResult;
use crate::CacheControl;
use crate::CacheControlError;

#[derive(Clone, Debug, Default)]
pub struct MSRPrefetchGuard;

impl MSRPrefetchGuard {
    pub fn from_os() -> Self {
        Self
    }
}

impl CacheControl for MSRPrefetchGuard {
    fn disable_guards(&self, _core_id: LogicalCoreId) -> CCResult<()> {
        Err(CacheControlError::Unsupported(
            "MSR guards are available on Linux x86_64 only",
        ))
    }

    fn enable_guards(&self, _core_id: LogicalCoreId) -> CCResult<()> {
        Ok(())
    }

    fn is_enabled(&self, _core_id: LogicalCoreId) -> CCResult<bool> {
        Ok(true)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }
}
