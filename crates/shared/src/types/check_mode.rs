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

/// Defines what a cache-state worker does before it queries the cache state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMode {
    /// Query the state as is.
    CheckOnly,
    /// Open a disable/enable bracket around the query.
    DisableThenCheck,
}

impl CheckMode {
    pub const ALL: [CheckMode; 2] = [CheckMode::CheckOnly, CheckMode::DisableThenCheck];

    pub fn disables_guards(&self) -> bool {
        matches!(self, CheckMode::DisableThenCheck)
    }

    /// The cache state a worker should observe in this mode.
    pub fn expected_enabled(&self) -> bool {
        !self.disables_guards()
    }
}

impl std::fmt::Display for CheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckMode::CheckOnly => write!(f, "check-only"),
            CheckMode::DisableThenCheck => write!(f, "disable-then-check"),
        }
    }
}
