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

mod errors;
#[cfg(test)]
mod tests;

use std::thread;

use cpu_utils::pinning;
use cpu_utils::priority;
use cpu_utils::priority::WorkerPriority;
use cpu_utils::CPUTopology;
use cpu_utils::LogicalCoreId;
use tokio::sync::oneshot;

pub use errors::LaunchError;

pub type LaunchResult<T> = Result<T, LaunchError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchParams {
    pub core_id: LogicalCoreId,
    pub priority: WorkerPriority,
    pub stack_size: usize,
    pub name: String,
}

/// Spawns OS threads pinned to a particular logical core.
#[derive(Clone, Debug)]
pub struct WorkerLauncher {
    topology: CPUTopology,
}

#[derive(Debug)]
pub struct WorkerHandle {
    core_id: LogicalCoreId,
    handle: thread::JoinHandle<()>,
}

impl WorkerLauncher {
    pub fn new(topology: CPUTopology) -> Self {
        Self { topology }
    }

    /// Starts the provided closure on a fresh thread and resolves once the thread is pinned
    /// to the requested core, the closure starts right after that.
    pub async fn launch<F>(&self, params: LaunchParams, work: F) -> LaunchResult<WorkerHandle>
    where
        F: FnOnce(LogicalCoreId) + Send + 'static,
    {
        let LaunchParams {
            core_id,
            priority,
            stack_size,
            name,
        } = params;
        self.topology.ensure_available(core_id)?;

        let (pinned_inlet, pinned_outlet) = oneshot::channel();
        let handle = thread::Builder::new()
            .name(name.clone())
            .stack_size(stack_size)
            .spawn(move || {
                if !pinning::pin_current_thread_to(core_id) {
                    let _ = pinned_inlet.send(false);
                    return;
                }
                if !priority::set_current_thread_priority(priority) {
                    log::debug!("{name}: priority {priority:?} wasn't applied, keep the default");
                }

                if pinned_inlet.send(true).is_err() {
                    // launcher was dropped before the worker got pinned
                    return;
                }
                work(core_id);
            })
            .map_err(LaunchError::spawn_failed)?;

        match pinned_outlet.await {
            Ok(true) => Ok(WorkerHandle { core_id, handle }),
            Ok(false) => Err(LaunchError::PinningFailed { core_id }),
            Err(_) => Err(LaunchError::WorkerDied { core_id }),
        }
    }
}

impl WorkerHandle {
    pub fn core_id(&self) -> LogicalCoreId {
        self.core_id
    }

    /// Waits for the worker to exit without blocking the runtime.
    pub async fn join(self) -> LaunchResult<()> {
        let core_id = self.core_id;
        let handle = self.handle;

        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(LaunchError::WorkerDied { core_id }),
        }
    }
}
