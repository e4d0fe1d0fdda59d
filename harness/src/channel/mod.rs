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

//! Single-slot handoff used by a pinned worker to report its outcome to the orchestrator.

mod errors;
#[cfg(test)]
mod tests;

use std::time::Duration;

use tokio::sync::mpsc;

pub use errors::ChannelError;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Creates a channel holding at most one outstanding value.
/// A channel is created per iteration and its inlet moved into a worker.
pub fn channel<T>() -> (ResultInlet<T>, ResultOutlet<T>) {
    let (inlet, outlet) = mpsc::channel(1);
    (ResultInlet { inlet }, ResultOutlet { outlet })
}

#[derive(Debug)]
pub struct ResultInlet<T> {
    inlet: mpsc::Sender<T>,
}

#[derive(Debug)]
pub struct ResultOutlet<T> {
    outlet: mpsc::Receiver<T>,
}

impl<T> ResultInlet<T> {
    /// Posts a value without blocking, fails if the previous value hasn't been drained yet.
    pub fn send(&self, value: T) -> ChannelResult<()> {
        use mpsc::error::TrySendError;

        self.inlet.try_send(value).map_err(|error| match error {
            TrySendError::Full(_) => ChannelError::Full,
            TrySendError::Closed(_) => ChannelError::Closed,
        })
    }
}

impl<T> ResultOutlet<T> {
    /// Waits for a value at most for the provided timeout.
    pub async fn receive(&mut self, timeout: Duration) -> ChannelResult<T> {
        match tokio::time::timeout(timeout, self.outlet.recv()).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ChannelError::WorkerGone),
            Err(_) => Err(ChannelError::timeout(timeout)),
        }
    }
}
