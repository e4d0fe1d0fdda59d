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

use cfh_cache_control::CCResult;
use cfh_cache_control::CacheControl;
use cfh_cache_control::CacheControlError;
use cfh_shared::types::LogicalCoreId;
use cfh_shared::Capabilities;
use cpu_utils::pinning;
use parking_lot::Mutex;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CacheOp {
    Disable,
    Enable,
    Query,
}

/// A single call to the cache control, together with the core the calling thread was pinned to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CacheEvent {
    pub op: CacheOp,
    pub core_id: LogicalCoreId,
    pub thread_core: Option<LogicalCoreId>,
}

#[derive(Debug, Default)]
struct MockState {
    disabled_by: Option<LogicalCoreId>,
    events: Vec<CacheEvent>,
}

/// Cache control keeping the cache state in memory and recording every call.
/// It could be made misbehaving on a particular core.
#[derive(Debug)]
pub struct RecordingCacheControl {
    state: Mutex<MockState>,
    capabilities: Capabilities,
    ignore_disable_on: Option<LogicalCoreId>,
    stall_query_on: Option<(LogicalCoreId, Duration)>,
    fail_enable_on: Option<LogicalCoreId>,
}

impl RecordingCacheControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            capabilities: Capabilities::CACHE_QUERY,
            ignore_disable_on: None,
            stall_query_on: None,
            fail_enable_on: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Disable requests from the core succeed, but the cache stays enabled.
    pub fn ignoring_disable_on(mut self, core_id: LogicalCoreId) -> Self {
        self.ignore_disable_on = Some(core_id);
        self
    }

    /// Queries from the core block for the provided duration.
    pub fn stalling_query_on(mut self, core_id: LogicalCoreId, stall: Duration) -> Self {
        self.stall_query_on = Some((core_id, stall));
        self
    }

    pub fn failing_enable_on(mut self, core_id: LogicalCoreId) -> Self {
        self.fail_enable_on = Some(core_id);
        self
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.state.lock().events.clone()
    }

    fn record(&self, state: &mut MockState, op: CacheOp, core_id: LogicalCoreId) {
        state.events.push(CacheEvent {
            op,
            core_id,
            thread_core: pinning::current_core(),
        });
    }
}

impl Default for RecordingCacheControl {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheControl for RecordingCacheControl {
    fn disable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, CacheOp::Disable, core_id);

        if let Some(holder) = state.disabled_by {
            return Err(CacheControlError::bracket_held(core_id, holder));
        }
        if self.ignore_disable_on != Some(core_id) {
            state.disabled_by = Some(core_id);
        }
        Ok(())
    }

    fn enable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        let mut state = self.state.lock();
        self.record(&mut state, CacheOp::Enable, core_id);

        if self.fail_enable_on == Some(core_id) {
            return Err(CacheControlError::Unsupported("enable is broken on this core"));
        }
        match state.disabled_by {
            Some(holder) if holder != core_id => {
                Err(CacheControlError::not_bracket_holder(core_id, Some(holder)))
            }
            _ => {
                state.disabled_by = None;
                Ok(())
            }
        }
    }

    fn is_enabled(&self, core_id: LogicalCoreId) -> CCResult<bool> {
        let enabled = {
            let mut state = self.state.lock();
            self.record(&mut state, CacheOp::Query, core_id);
            state.disabled_by.is_none()
        };

        if let Some((stalling_core, stall)) = self.stall_query_on {
            if stalling_core == core_id {
                std::thread::sleep(stall);
            }
        }
        Ok(enabled)
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
