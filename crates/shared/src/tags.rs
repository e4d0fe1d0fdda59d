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

use serde::Deserialize;
use serde::Serialize;

use crate::types::TargetId;
use crate::Capabilities;

/// Applicability and routing metadata of a test case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestTags {
    /// Free-form groups, e.g. `spi_flash`, `mspi`.
    pub groups: Vec<String>,
    pub required: Capabilities,
    pub min_cores: usize,
    pub excluded_targets: Vec<TargetId>,
    /// The restart tag a runner should expect after the first stage,
    /// e.g. "Cache disabled,SW_RESET".
    pub expected_reset: Option<String>,
}

impl TestTags {
    pub fn new(groups: &[&str]) -> Self {
        Self {
            groups: groups.iter().map(|group| group.to_string()).collect(),
            min_cores: 1,
            ..<_>::default()
        }
    }

    pub fn requires(mut self, capabilities: Capabilities) -> Self {
        self.required |= capabilities;
        self
    }

    pub fn min_cores(mut self, min_cores: usize) -> Self {
        self.min_cores = min_cores;
        if min_cores > 1 {
            self.required |= Capabilities::MULTI_CORE;
        }
        self
    }

    pub fn exclude_target(mut self, target: impl Into<TargetId>) -> Self {
        self.excluded_targets.push(target.into());
        self
    }

    pub fn expect_reset(mut self, reset_tag: impl Into<String>) -> Self {
        self.expected_reset = Some(reset_tag.into());
        self
    }

    pub fn is_excluded_on(&self, target: &TargetId) -> bool {
        self.excluded_targets.contains(target)
    }

    /// Renders tags in the `[group][reset=...]` form test runners route by.
    pub fn to_runner_string(&self) -> String {
        let mut rendered = self
            .groups
            .iter()
            .map(|group| format!("[{group}]"))
            .collect::<String>();
        if let Some(reset) = &self.expected_reset {
            rendered.push_str(&format!("[reset={reset}]"));
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runner_string_contains_reset_tag() {
        let tags = TestTags::new(&["mspi"]).expect_reset("Cache error,SW_CPU");
        assert_eq!(tags.to_runner_string(), "[mspi][reset=Cache error,SW_CPU]");
    }

    #[test]
    fn multi_core_requirement_is_implied() {
        let tags = TestTags::new(&["mspi"]).min_cores(2);
        assert!(tags.required.contains(Capabilities::MULTI_CORE));
    }
}
