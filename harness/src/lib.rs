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

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![deny(
    dead_code,
    nonstandard_style,
    unused_imports,
    unused_mut,
    unused_variables,
    unused_unsafe,
    unreachable_patterns
)]

mod bootstrap;
pub mod channel;
mod errors;
pub mod launcher;
pub mod orchestrator;
mod platform;
pub mod registry;
pub mod restart;
pub mod stage;
mod state_storage;
mod storage_utils;

pub use bootstrap::CacheFaultHarness;
pub use errors::HarnessError;
pub use orchestrator::StageOrchestrator;
pub use orchestrator::TestFailure;
pub use orchestrator::TestOutcome;
pub use platform::Platform;
pub use registry::TestCase;
pub use registry::TestCaseSummary;
pub use registry::TestRegistry;
pub use state_storage::StageMarker;
pub use state_storage::StageMarkerStorage;
pub use state_storage::StorageError;

pub type HarnessResult<T> = Result<T, HarnessError>;

pub(crate) use cfh_shared::types::*;
pub(crate) use cfh_shared::Capabilities;
