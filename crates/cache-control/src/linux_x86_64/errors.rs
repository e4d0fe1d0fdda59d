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
use nix::errno::Errno;
use thiserror::Error as ThisError;

use cfh_shared::types::LogicalCoreId;

#[derive(ThisError, Debug)]
pub enum MSRError {
    #[error("failed to open {path}, is the msr module loaded? {io_error}")]
    Open {
        path: String,
        io_error: std::io::Error,
    },

    #[error("core {core_id}: failed to read MSR {register:#x}: {errno}")]
    Read {
        register: u32,
        core_id: LogicalCoreId,
        errno: Errno,
    },

    #[error("core {core_id}: failed to write {value:#x} into MSR {register:#x}: {errno}")]
    Write {
        register: u32,
        value: u64,
        core_id: LogicalCoreId,
        errno: Errno,
    },
}

impl MSRError {
    pub(crate) fn open(path: String, io_error: std::io::Error) -> Self {
        Self::Open { path, io_error }
    }

    pub(crate) fn read(register: u32, core_id: LogicalCoreId, errno: Errno) -> Self {
        Self::Read {
            register,
            core_id,
            errno,
        }
    }

    pub(crate) fn write(register: u32, value: u64, core_id: LogicalCoreId, errno: Errno) -> Self {
        Self::Write {
            register,
            value,
            core_id,
            errno,
        }
    }
}
