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

/// Scheduling priority of a pinned worker, mapped onto a thread niceness value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkerPriority {
    #[default]
    Normal,
    High,
    /// The highest priority the OS lets this process request,
    /// analogue of `configMAX_PRIORITIES - 1` on RTOS schedulers.
    Max,
}

impl WorkerPriority {
    pub fn niceness(&self) -> i32 {
        match self {
            WorkerPriority::Normal => 0,
            WorkerPriority::High => -10,
            WorkerPriority::Max => -20,
        }
    }
}

/// Applies priority to the calling thread.
/// Returns true, if the OS accepted the new niceness.
#[cfg(target_os = "linux")]
pub fn set_current_thread_priority(priority: WorkerPriority) -> bool {
    if priority == WorkerPriority::Normal {
        return true;
    }

    // SAFETY: gettid and setpriority only touch the calling thread's scheduling state
    unsafe {
        let tid = libc::gettid();
        libc::setpriority(libc::PRIO_PROCESS, tid as libc::id_t, priority.niceness()) == 0
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_current_thread_priority(priority: WorkerPriority) -> bool {
    priority == WorkerPriority::Normal
}
