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
use std::fs::File;
use std::fs::OpenOptions;

use nix::sys::uio::pread;
use nix::sys::uio::pwrite;

use cfh_shared::types::LogicalCoreId;

use super::errors::MSRError;

/// The msr device of one logical core, offsets into it are register ids.
pub(crate) struct MsrFile {
    core_id: LogicalCoreId,
    file: File,
}

impl MsrFile {
    pub(crate) fn open(core_id: LogicalCoreId) -> Result<Self, MSRError> {
        let path = Self::path(core_id);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|io_error| MSRError::open(path, io_error))?;

        Ok(Self { core_id, file })
    }

    pub(crate) fn read(&self, register: u32) -> Result<u64, MSRError> {
        let mut bytes = [0u8; 8];
        pread(&self.file, &mut bytes, register.into())
            .map_err(|errno| MSRError::read(register, self.core_id, errno))?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub(crate) fn write(&self, register: u32, value: u64) -> Result<(), MSRError> {
        tracing::debug!("core {}: MSR {register:#x} <- {value:#x}", self.core_id);

        pwrite(&self.file, &value.to_le_bytes(), register.into())
            .map_err(|errno| MSRError::write(register, value, self.core_id, errno))?;
        Ok(())
    }

    fn path(core_id: LogicalCoreId) -> String {
        format!("/dev/cpu/{core_id}/msr")
    }
}
