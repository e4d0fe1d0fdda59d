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

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

const DRAFT_EXTENSION: &str = "draft";

/// Writes data to a sibling draft file first and then atomically renames it over the target,
/// so a crash in the middle of saving leaves either the old or the new content.
pub(crate) fn save_reliably(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let draft_path = draft_path(path);

    let mut draft = std::fs::File::create(&draft_path)?;
    draft.write_all(data)?;
    draft.sync_all()?;
    drop(draft);

    std::fs::rename(&draft_path, path)
}

/// Removes a file, a missing file isn't an error.
pub(crate) fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn draft_path(path: &Path) -> PathBuf {
    let mut draft = path.as_os_str().to_owned();
    draft.push(".");
    draft.push(DRAFT_EXTENSION);
    PathBuf::from(draft)
}
