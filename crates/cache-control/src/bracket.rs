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

use crate::CCResult;
use crate::CacheControlError;

/// Process-wide cache path state, between a disable and an enable it
/// remembers the core holding the bracket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct GuardBracket {
    enabled: bool,
    holder: Option<LogicalCoreId>,
}

impl GuardBracket {
    pub(crate) fn new() -> Self {
        Self {
            enabled: true,
            holder: None,
        }
    }

    pub(crate) fn disable(&mut self, core_id: LogicalCoreId) -> CCResult<()> {
        if let Some(holder) = self.holder {
            return Err(CacheControlError::bracket_held(core_id, holder));
        }

        self.enabled = false;
        self.holder = Some(core_id);
        Ok(())
    }

    pub(crate) fn enable(&mut self, core_id: LogicalCoreId) -> CCResult<()> {
        if self.holder != Some(core_id) {
            return Err(CacheControlError::not_bracket_holder(core_id, self.holder));
        }

        self.enabled = true;
        self.holder = None;
        Ok(())
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }
}
