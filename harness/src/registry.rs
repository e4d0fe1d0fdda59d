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

//! Built-in test cases and their lookup by name.

use std::sync::Arc;

use cfh_config::TargetExpectation;
use cfh_shared::TestTags;
use serde::Serialize;

use crate::stage::BusGateFaultStage;
use crate::stage::CacheFaultStage;
use crate::stage::CacheStateStage;
use crate::stage::CoreSlot;
use crate::stage::FaultVariant;
use crate::stage::RestartVerificationStage;
use crate::stage::Stage;
use crate::Capabilities;

const FIRST_CORE: CoreSlot = CoreSlot(0);
const SECOND_CORE: CoreSlot = CoreSlot(1);

/// Cache fault cases are temporarily disabled on this target.
const TARGET_WITHOUT_GUARDS: &str = "esp32s2";

#[derive(Clone)]
pub struct TestCase {
    name: String,
    tags: TestTags,
    stages: Vec<Arc<dyn Stage>>,
}

/// What `list` reports about a test case to an external runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestCaseSummary {
    pub name: String,
    pub groups: Vec<String>,
    pub stages: Vec<String>,
    pub runner_tags: String,
    pub expected_reset: Option<String>,
}

impl TestCase {
    pub fn single_stage(name: impl Into<String>, tags: TestTags, stage: Arc<dyn Stage>) -> Self {
        Self::multi_stage(name, tags, vec![stage])
    }

    pub fn multi_stage(
        name: impl Into<String>,
        tags: TestTags,
        stages: Vec<Arc<dyn Stage>>,
    ) -> Self {
        Self {
            name: name.into(),
            tags,
            stages,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &TestTags {
        &self.tags
    }

    pub fn stage(&self, index: usize) -> Option<&Arc<dyn Stage>> {
        self.stages.get(index)
    }

    pub fn stages_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_multi_stage(&self) -> bool {
        self.stages.len() > 1
    }

    pub fn summary(&self) -> TestCaseSummary {
        TestCaseSummary {
            name: self.name.clone(),
            groups: self.tags.groups.clone(),
            stages: self
                .stages
                .iter()
                .map(|stage| stage.name().to_string())
                .collect(),
            runner_tags: self.tags.to_runner_string(),
            expected_reset: self.tags.expected_reset.clone(),
        }
    }
}

#[derive(Clone, Default)]
pub struct TestRegistry {
    cases: Vec<TestCase>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in cases, reset tags are taken from the target expectation.
    pub fn builtin(expectation: &TargetExpectation) -> Self {
        let mut registry = Self::new();

        registry.register(TestCase::single_stage(
            "cache_enabled_query_works_on_all_cores",
            TestTags::new(&["spi_flash", "esp_flash"]).requires(Capabilities::CACHE_QUERY),
            Arc::new(CacheStateStage),
        ));

        for (name, core, min_cores) in [
            ("invalid_access_to_cache_raises_panic_on_first_core", FIRST_CORE, 1),
            ("invalid_access_to_cache_raises_panic_on_second_core", SECOND_CORE, 2),
        ] {
            registry.register(TestCase::multi_stage(
                name,
                TestTags::new(&["mspi"])
                    .requires(Capabilities::FAULT_INJECTION)
                    .min_cores(min_cores)
                    .exclude_target(TARGET_WITHOUT_GUARDS)
                    .expect_reset(expectation.reset_tag.clone()),
                vec![
                    Arc::new(CacheFaultStage::new(core)),
                    Arc::new(RestartVerificationStage::new(
                        FaultVariant::CacheDisabled,
                        core,
                    )),
                ],
            ));
        }

        // the runner tag is shared with the cache variant, while the verified cause is its own
        registry.register(TestCase::multi_stage(
            "invalid_access_through_closed_bus_gates",
            TestTags::new(&["mspi"])
                .requires(Capabilities::FAULT_INJECTION | Capabilities::BUS_GATE)
                .exclude_target(TARGET_WITHOUT_GUARDS)
                .expect_reset(expectation.reset_tag.clone()),
            vec![
                Arc::new(BusGateFaultStage::new(FIRST_CORE)),
                Arc::new(RestartVerificationStage::new(
                    FaultVariant::BusGateClosed,
                    FIRST_CORE,
                )),
            ],
        ));

        registry
    }

    /// Test cases are immutable once registered, a case with an existing name replaces it.
    pub fn register(&mut self, case: TestCase) {
        self.cases.retain(|existing| existing.name != case.name);
        self.cases.push(case);
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.name == name)
    }

    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }
}
