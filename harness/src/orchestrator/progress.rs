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

/// Progress of a multi-stage test across process lifetimes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageProgress {
    NotStarted,
    Running { stage: usize },
    CompletedNormally { stage: usize },
    /// The process came back after a stage that restarts it.
    ProcessRestarted { next_stage: usize },
    Verified { stage: usize },
    Failed { stage: usize },
}

impl StageProgress {
    /// Where a process starts, given the stage it's about to run.
    pub fn on_launch(stage: usize) -> Self {
        if stage == 0 {
            StageProgress::NotStarted
        } else {
            StageProgress::ProcessRestarted { next_stage: stage }
        }
    }
}

impl std::fmt::Display for StageProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageProgress::NotStarted => write!(f, "not started"),
            StageProgress::Running { stage } => write!(f, "stage {stage} running"),
            StageProgress::CompletedNormally { stage } => {
                write!(f, "stage {stage} completed normally")
            }
            StageProgress::ProcessRestarted { next_stage } => {
                write!(f, "process restarted, resuming at stage {next_stage}")
            }
            StageProgress::Verified { stage } => write!(f, "stage {stage} verified"),
            StageProgress::Failed { stage } => write!(f, "stage {stage} failed"),
        }
    }
}
