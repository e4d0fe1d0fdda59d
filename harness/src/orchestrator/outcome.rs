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

use cfh_cache_control::RegionError;
use cfh_shared::RestartCause;
use thiserror::Error as ThisError;

use crate::launcher::LaunchError;
use crate::state_storage::StorageError;
use crate::CheckMode;
use crate::LogicalCoreId;

#[derive(Debug)]
pub enum TestOutcome {
    Passed,
    /// The test doesn't apply to the platform, it's never reported as passed.
    Skipped(String),
    Failed(TestFailure),
}

#[derive(ThisError, Debug)]
pub enum TestFailure {
    #[error("worker on core {core_id} didn't report in {timeout:?} in {mode} mode")]
    WorkerTimeout {
        core_id: LogicalCoreId,
        mode: CheckMode,
        timeout: Duration,
    },

    #[error(
        "core {core_id} in {mode} mode observed cache enabled = {observed}, expected {expected}"
    )]
    StateMismatch {
        core_id: LogicalCoreId,
        mode: CheckMode,
        expected: bool,
        observed: bool,
    },

    #[error("expected restart did not occur after stage {stage}")]
    MissingFault { stage: String },

    #[error("expected restart cause {expected}, but the last restart was {actual}")]
    WrongRestartCause {
        expected: RestartCause,
        actual: RestartCause,
    },

    #[error("expected the restart to originate on core {expected}, but it originated on core {actual}")]
    WrongOriginCore {
        expected: LogicalCoreId,
        actual: LogicalCoreId,
    },

    #[error("guarded region can't be used: {0}")]
    InvalidRegion(#[from] RegionError),

    #[error("worker on core {core_id} failed: {error}")]
    WorkerFailed {
        core_id: LogicalCoreId,
        error: String,
    },

    #[error("failed to launch a worker: {0}")]
    LaunchFailed(#[from] LaunchError),

    #[error("test {test} has {stages_count} stages, there is no stage {index}")]
    UnknownStage {
        test: String,
        index: usize,
        stages_count: usize,
    },

    #[error("the test needs core #{index} of the configured set, but only {available} are configured")]
    CoreNotConfigured { index: usize, available: usize },

    #[error("platform doesn't provide {0}")]
    MissingAdapter(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TestFailure {
    pub fn worker_timeout(core_id: LogicalCoreId, mode: CheckMode, timeout: Duration) -> Self {
        Self::WorkerTimeout {
            core_id,
            mode,
            timeout,
        }
    }

    pub fn state_mismatch(core_id: LogicalCoreId, mode: CheckMode, observed: bool) -> Self {
        Self::StateMismatch {
            core_id,
            mode,
            expected: mode.expected_enabled(),
            observed,
        }
    }

    pub fn missing_fault(stage: impl Into<String>) -> Self {
        Self::MissingFault {
            stage: stage.into(),
        }
    }

    pub fn wrong_restart_cause(expected: RestartCause, actual: RestartCause) -> Self {
        Self::WrongRestartCause { expected, actual }
    }

    pub fn wrong_origin_core(expected: LogicalCoreId, actual: LogicalCoreId) -> Self {
        Self::WrongOriginCore { expected, actual }
    }

    pub fn worker_failed(core_id: LogicalCoreId, error: impl ToString) -> Self {
        Self::WorkerFailed {
            core_id,
            error: error.to_string(),
        }
    }
}

impl TestOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed(_))
    }
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "passed"),
            TestOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            TestOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

impl From<TestFailure> for TestOutcome {
    fn from(failure: TestFailure) -> Self {
        TestOutcome::Failed(failure)
    }
}
