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
use cfh_config::TargetExpectation;
use cfh_shared::RestartCause;

use super::CoreSlot;
use super::Stage;
use super::StageCompletion;
use super::StageContext;
use super::StageResult;
use crate::TestFailure;

/// Which fault-injection variant preceded the verification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultVariant {
    CacheDisabled,
    BusGateClosed,
}

impl FaultVariant {
    pub fn expected_cause(&self, expectation: &TargetExpectation) -> RestartCause {
        match self {
            FaultVariant::CacheDisabled => expectation.cache_fault_cause,
            FaultVariant::BusGateClosed => expectation.bus_gate_fault_cause,
        }
    }
}

/// Runs after the restart and checks it was the one the fault stage provoked.
#[derive(Clone, Debug)]
pub struct RestartVerificationStage {
    variant: FaultVariant,
    expected_core: CoreSlot,
}

impl RestartVerificationStage {
    pub fn new(variant: FaultVariant, expected_core: CoreSlot) -> Self {
        Self {
            variant,
            expected_core,
        }
    }
}

#[async_trait]
impl Stage for RestartVerificationStage {
    fn name(&self) -> &str {
        "verify_restart_reason"
    }

    fn completion(&self) -> StageCompletion {
        StageCompletion::Returns
    }

    async fn run(&self, context: &StageContext) -> StageResult {
        let record = context.oracle.last_restart();
        let expected = self.variant.expected_cause(&context.expectation);
        log::info!(
            "last restart: {record}, {:?} on {} expects {expected}",
            self.variant,
            context.target
        );

        if record.cause != expected {
            return Err(TestFailure::wrong_restart_cause(expected, record.cause));
        }

        let expected_core = self.expected_core.resolve(&context.cores)?;
        match record.origin_core {
            Some(origin_core) if origin_core != expected_core => Err(
                TestFailure::wrong_origin_core(expected_core, origin_core),
            ),
            Some(_) => Ok(()),
            None => {
                log::warn!(
                    "restart record has no origin core, can't verify the fault came from core {expected_core}"
                );
                Ok(())
            }
        }
    }
}
