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
use parking_lot::Mutex;

use cfh_shared::types::LogicalCoreId;
use cfh_shared::Capabilities;

use super::msr_file::MsrFile;
use super::prefetch_control::PrefetchControl;
use super::prefetch_control::PREFETCH_CONTROL;
use crate::bracket::GuardBracket;
use crate::CCResult;
use crate::CacheControl;
use crate::CacheControlError;

/// Treats hardware prefetchers as the cache guard: disabling guards sets the prefetch
/// disable bits of the holder core, enabling writes back the value seen before.
#[derive(Debug)]
pub struct MSRPrefetchGuard {
    control: PrefetchControl,
    state: Mutex<GuardState>,
}

#[derive(Debug)]
struct GuardState {
    bracket: GuardBracket,
    // register value of the holder core before the bracket was opened
    saved_value: Option<u64>,
}

impl MSRPrefetchGuard {
    pub fn from_os() -> Self {
        Self::new(*PREFETCH_CONTROL)
    }

    pub fn new(control: PrefetchControl) -> Self {
        Self {
            control,
            state: Mutex::new(GuardState {
                bracket: GuardBracket::new(),
                saved_value: None,
            }),
        }
    }

    fn register(&self) -> CCResult<u32> {
        self.control
            .register()
            .ok_or(CacheControlError::Unsupported("no known prefetch control MSR"))
    }
}

impl CacheControl for MSRPrefetchGuard {
    fn disable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        let register = self.register()?;

        let mut state = self.state.lock();
        state.bracket.disable(core_id)?;

        let switched_off = MsrFile::open(core_id).and_then(|msr| {
            let value = msr.read(register)?;
            msr.write(register, self.control.guards_off(value))?;
            Ok(value)
        });

        match switched_off {
            Ok(value) => {
                state.saved_value = Some(value);
                Ok(())
            }
            Err(error) => {
                // nothing was written, the bracket can't stay open
                state.bracket.enable(core_id)?;
                Err(error.into())
            }
        }
    }

    fn enable_guards(&self, core_id: LogicalCoreId) -> CCResult<()> {
        let register = self.register()?;

        let mut state = self.state.lock();
        state.bracket.enable(core_id)?;

        if let Some(value) = state.saved_value.take() {
            MsrFile::open(core_id)?.write(register, value)?;
        }
        Ok(())
    }

    fn is_enabled(&self, core_id: LogicalCoreId) -> CCResult<bool> {
        let Some(register) = self.control.register() else {
            return Ok(true);
        };

        let value = MsrFile::open(core_id)?.read(register)?;
        Ok(self.control.guards_enabled(value))
    }

    fn capabilities(&self) -> Capabilities {
        match self.control {
            PrefetchControl::Unsupported => Capabilities::empty(),
            _ => Capabilities::CACHE_QUERY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_cpu_has_no_guards() {
        let guard = MSRPrefetchGuard::new(PrefetchControl::Unsupported);

        assert_eq!(guard.capabilities(), Capabilities::empty());
        assert!(guard.is_enabled(0.into()).unwrap());
        assert!(matches!(
            guard.disable_guards(0.into()),
            Err(CacheControlError::Unsupported(_))
        ));
    }

    #[test]
    fn enable_without_disable_is_rejected() {
        let guard = MSRPrefetchGuard::new(PrefetchControl::IntelMiscFeature);

        let error = guard.enable_guards(0.into()).unwrap_err();
        assert!(matches!(
            error,
            CacheControlError::NotBracketHolder { holder: None, .. }
        ));
    }
}
