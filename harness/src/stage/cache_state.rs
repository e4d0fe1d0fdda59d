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

use async_trait::async_trait;
use cfh_cache_control::CCResult;
use cfh_cache_control::CacheControl;
use itertools::iproduct;

use super::Stage;
use super::StageCompletion;
use super::StageContext;
use super::StageResult;
use crate::channel;
use crate::channel::ChannelError;
use crate::CheckMode;
use crate::LogicalCoreId;
use crate::TestFailure;

const WORKER_NAME: &str = "cache-state";

/// Checks that every configured core observes the cache state it has just set.
#[derive(Clone, Debug, Default)]
pub struct CacheStateStage;

#[async_trait]
impl Stage for CacheStateStage {
    fn name(&self) -> &str {
        "cache_state_on_all_cores"
    }

    fn completion(&self) -> StageCompletion {
        StageCompletion::Returns
    }

    async fn run(&self, context: &StageContext) -> StageResult {
        for (&core_id, mode) in iproduct!(context.cores.iter(), CheckMode::ALL) {
            let observed = check_on_core(context, core_id, mode).await?;
            log::info!("core {core_id}, {mode}: cache enabled = {observed}");

            if observed != mode.expected_enabled() {
                return Err(TestFailure::state_mismatch(core_id, mode, observed));
            }
        }

        Ok(())
    }
}

async fn check_on_core(
    context: &StageContext,
    core_id: LogicalCoreId,
    mode: CheckMode,
) -> Result<bool, TestFailure> {
    let (inlet, mut outlet) = channel::channel();
    let cache = context.platform.cache().clone();

    let worker = context
        .launcher
        .launch(
            context.launch_params(core_id, WORKER_NAME),
            move |core_id| {
                let report = check_cache_state(cache.as_ref(), core_id, mode);
                if let Err(e) = inlet.send(report) {
                    log::error!("core {core_id}: failed to report cache state: {e}");
                }
            },
        )
        .await?;

    let observed = match outlet.receive(context.report_timeout).await {
        Ok(Ok(observed)) => observed,
        Ok(Err(e)) => return Err(TestFailure::worker_failed(core_id, e)),
        Err(ChannelError::Timeout { timeout }) => {
            return Err(TestFailure::worker_timeout(core_id, mode, timeout))
        }
        Err(e) => return Err(TestFailure::worker_failed(core_id, e)),
    };

    // the next iteration may open a bracket only after this worker is gone
    worker.join().await?;
    Ok(observed)
}

/// Runs on the pinned core. The bracket is closed before the result is reported,
/// even if the query itself failed.
fn check_cache_state(
    cache: &dyn CacheControl,
    core_id: LogicalCoreId,
    mode: CheckMode,
) -> CCResult<bool> {
    if !mode.disables_guards() {
        return cache.is_enabled(core_id);
    }

    cache.disable_guards(core_id)?;
    let observed = cache.is_enabled(core_id);
    cache.enable_guards(core_id)?;

    observed
}
