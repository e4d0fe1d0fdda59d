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

use nonempty::NonEmpty;

use crate::errors::CPUTopologyError;
use crate::CTResult;
use crate::LogicalCoreId;

#[derive(Clone, Debug)]
pub struct CPUTopology {
    logical_cores: NonEmpty<LogicalCoreId>,
}

impl CPUTopology {
    pub fn new() -> CTResult<Self> {
        let logical_core_ids = core_affinity::get_core_ids()
            .unwrap_or_default()
            .into_iter()
            .map(|core_id| LogicalCoreId::from(core_id.id as u32))
            .collect::<Vec<_>>();

        Self::from_cores(logical_core_ids)
    }

    pub fn from_cores(logical_core_ids: Vec<LogicalCoreId>) -> CTResult<Self> {
        let logical_cores =
            NonEmpty::from_vec(logical_core_ids).ok_or(CPUTopologyError::LogicalCoresNotFound)?;
        Ok(Self { logical_cores })
    }

    pub fn logical_cores(&self) -> &NonEmpty<LogicalCoreId> {
        &self.logical_cores
    }

    pub fn logical_cores_count(&self) -> usize {
        self.logical_cores.len()
    }

    pub fn ensure_available(&self, core_id: LogicalCoreId) -> CTResult<()> {
        if self.logical_cores.iter().any(|&id| id == core_id) {
            return Ok(());
        }

        Err(CPUTopologyError::logical_core_not_found(
            core_id,
            self.logical_cores_count(),
        ))
    }
}
