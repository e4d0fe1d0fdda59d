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

use std::path::PathBuf;

use cfh_shared::RestartRecord;

use super::RestartOracle;
use super::PENDING_RESTART_FILE;
use crate::state_storage::StorageError;
use crate::storage_utils::remove_if_exists;

pub struct BootRecorder {
    state_dir: PathBuf,
}

/// The restart record of the current boot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootRecord {
    record: RestartRecord,
}

impl BootRecorder {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Promotes the record left by a fault handler of the previous process into the record
    /// of this boot and consumes it, without such a record this boot is a power-on.
    pub async fn on_boot(&self) -> Result<BootRecord, StorageError> {
        let path = self.pending_path();
        let Some(record) = self.read_pending().await? else {
            log::info!("no pending restart record found, treating the boot as power-on");
            return Ok(BootRecord::new(RestartRecord::power_on()));
        };

        let task_path = path.clone();
        tokio::task::spawn_blocking(move || remove_if_exists(&task_path))
            .await?
            .map_err(|e| StorageError::io(path, e))?;

        log::info!("boot after restart: {record}");
        Ok(BootRecord::new(record))
    }

    /// Same classification as `on_boot`, but the pending record stays in place for the boot
    /// that will verify it.
    pub async fn inspect(&self) -> Result<BootRecord, StorageError> {
        let record = self
            .read_pending()
            .await?
            .unwrap_or_else(RestartRecord::power_on);
        Ok(BootRecord::new(record))
    }

    fn pending_path(&self) -> PathBuf {
        self.state_dir.join(PENDING_RESTART_FILE)
    }

    async fn read_pending(&self) -> Result<Option<RestartRecord>, StorageError> {
        let path = self.pending_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(path.clone(), e))?;

        let record = match serde_json::from_slice::<RestartRecord>(&data) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("failed to parse pending restart record from {path:?}: {e}");
                RestartRecord::fault(
                    cfh_shared::RestartCause::Unknown,
                    "unreadable restart record",
                    None,
                )
            }
        };

        Ok(Some(record))
    }
}

impl BootRecord {
    pub fn new(record: RestartRecord) -> Self {
        Self { record }
    }
}

impl RestartOracle for BootRecord {
    fn last_restart(&self) -> &RestartRecord {
        &self.record
    }
}
