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

mod outcome;
mod progress;
#[cfg(test)]
mod tests;

pub use outcome::TestFailure;
pub use outcome::TestOutcome;
pub use progress::StageProgress;

use crate::stage::StageCompletion;
use crate::stage::StageContext;
use crate::state_storage::StageMarker;
use crate::state_storage::StageMarkerStorage;
use crate::Capabilities;
use crate::TestCase;

/// Runs one stage of a test case per process lifetime and persists where to resume
/// after a stage restarting the process.
pub struct StageOrchestrator {
    context: StageContext,
    markers: StageMarkerStorage,
}

impl StageOrchestrator {
    pub fn new(context: StageContext, markers: StageMarkerStorage) -> Self {
        Self { context, markers }
    }

    pub fn context(&self) -> &StageContext {
        &self.context
    }

    /// Capabilities of the platform together with the ones implied by the configured cores.
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = self.context.platform.capabilities();
        if self.context.cores.len() > 1 {
            capabilities |= Capabilities::MULTI_CORE;
        }

        capabilities
    }

    /// Returns why the test doesn't apply here, if it doesn't.
    pub fn skip_reason(&self, test: &TestCase) -> Option<String> {
        let tags = test.tags();

        if tags.is_excluded_on(&self.context.target) {
            return Some(format!("target {} is excluded", self.context.target));
        }

        let missing = self.capabilities().missing(tags.required);
        if !missing.is_empty() {
            return Some(format!("platform lacks {missing:?}"));
        }

        if self.context.cores.len() < tags.min_cores {
            return Some(format!(
                "needs {} cores, {} configured",
                tags.min_cores,
                self.context.cores.len()
            ));
        }

        None
    }

    /// Runs the stage selected by the override, the persisted marker or the first one.
    pub async fn run(&self, test: &TestCase, stage_override: Option<usize>) -> TestOutcome {
        if let Some(reason) = self.skip_reason(test) {
            log::info!("{}: skipped, {reason}", test.name());
            return TestOutcome::Skipped(reason);
        }

        match self.run_stage(test, stage_override).await {
            Ok(()) => TestOutcome::Passed,
            Err(failure) => TestOutcome::Failed(failure),
        }
    }

    async fn run_stage(
        &self,
        test: &TestCase,
        stage_override: Option<usize>,
    ) -> Result<(), TestFailure> {
        let index = match stage_override {
            Some(index) => index,
            None if test.is_multi_stage() => self.markers.load(test.name()).await?.unwrap_or(0),
            None => 0,
        };

        let stage = test.stage(index).ok_or_else(|| TestFailure::UnknownStage {
            test: test.name().to_string(),
            index,
            stages_count: test.stages_count(),
        })?;

        let mut progress = StageProgress::on_launch(index);
        log::info!("{}: {progress}", test.name());
        self.transit(test, &mut progress, StageProgress::Running { stage: index });

        let is_last = index + 1 == test.stages_count();
        let result = match stage.completion() {
            StageCompletion::Restarts => {
                // persisted before the fault, so the relaunch resumes at the next stage
                self.markers
                    .save(&StageMarker::new(test.name(), index + 1))
                    .await?;
                let result = stage.run(&self.context).await;
                self.markers.clear().await?;

                // never retried, returning from such a stage is a failure by itself
                result.and(Err(TestFailure::missing_fault(stage.name())))
            }
            StageCompletion::Returns => {
                let result = stage.run(&self.context).await;
                if test.is_multi_stage() {
                    match (&result, is_last) {
                        (Ok(()), false) => {
                            self.markers
                                .save(&StageMarker::new(test.name(), index + 1))
                                .await?
                        }
                        _ => self.markers.clear().await?,
                    }
                }
                result
            }
        };

        let next = match (&result, stage.completion(), is_last) {
            (Err(_), _, _) => StageProgress::Failed { stage: index },
            (Ok(()), StageCompletion::Returns, true) if index > 0 => {
                StageProgress::Verified { stage: index }
            }
            _ => StageProgress::CompletedNormally { stage: index },
        };
        self.transit(test, &mut progress, next);

        result
    }

    fn transit(&self, test: &TestCase, progress: &mut StageProgress, next: StageProgress) {
        log::info!("{}: {progress} -> {next}", test.name());
        *progress = next;
    }
}
