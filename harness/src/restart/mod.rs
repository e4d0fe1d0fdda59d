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

//! Classification of the last restart, the counterpart of a platform reset-reason register.

mod boot_recorder;
mod fault_handler;

pub use cfh_shared::RestartOracle;

pub use boot_recorder::BootRecord;
pub use boot_recorder::BootRecorder;
pub use fault_handler::RebootingFaultHandler;
pub use fault_handler::FAULT_EXIT_CODE;

pub(crate) const PENDING_RESTART_FILE: &str = "pending_restart.json";
