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

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::storage_utils::remove_if_exists;
use crate::storage_utils::save_reliably;

const EXPECT_DEFAULT_SERIALIZER: &str = "the default serde serializer shouldn't fail";
const STAGE_FILE: &str = "stage.json";

#[derive(ThisError, Debug)]
pub enum StorageError {
    #[error("state storage io error on {path:?}: {error}")]
    IO {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("state storage task was cancelled: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl StorageError {
    pub fn io(path: PathBuf, error: std::io::Error) -> Self {
        Self::IO { path, error }
    }
}

/// Which stage the next launch of a multi-stage test should resume at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarker {
    pub test_name: String,
    pub next_stage: usize,
}

impl StageMarker {
    pub fn new(test_name: impl Into<String>, next_stage: usize) -> Self {
        Self {
            test_name: test_name.into(),
            next_stage,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StageMarkerStorage {
    state_dir: PathBuf,
}

impl StageMarkerStorage {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    pub async fn save(&self, marker: &StageMarker) -> Result<(), StorageError> {
        let data = serde_json::to_vec(marker).expect(EXPECT_DEFAULT_SERIALIZER);
        let path = self.marker_path();

        log::debug!("saving stage marker {marker:?} to {path:?}");

        let task_path = path.clone();
        tokio::task::spawn_blocking(move || save_reliably(&task_path, &data))
            .await?
            .map_err(|e| StorageError::io(path, e))
    }

    /// Returns the stage to resume at for the provided test,
    /// a marker left by another test or a corrupted one is ignored.
    pub async fn load(&self, test_name: &str) -> Result<Option<usize>, StorageError> {
        let path = self.marker_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(path.clone(), e))?;

        let marker: StageMarker = match serde_json::from_slice(&data) {
            Ok(marker) => marker,
            Err(e) => {
                log::warn!("failed to parse stage marker from {path:?}, ignoring: {e}");
                return Ok(None);
            }
        };

        if marker.test_name != test_name {
            log::warn!(
                "stage marker belongs to test {}, not to {test_name}, ignoring",
                marker.test_name
            );
            return Ok(None);
        }

        Ok(Some(marker.next_stage))
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let path = self.marker_path();
        let task_path = path.clone();

        tokio::task::spawn_blocking(move || remove_if_exists(&task_path))
            .await?
            .map_err(|e| StorageError::io(path, e))
    }

    fn marker_path(&self) -> PathBuf {
        self.state_dir.join(STAGE_FILE)
    }
}
