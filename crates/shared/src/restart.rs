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

use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::types::LogicalCoreId;

/// Why the last restart happened, as classified by the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartCause {
    PowerOn,
    SoftwareReset,
    Panic,
    Watchdog,
    Brownout,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("unknown restart cause {0:?}")]
pub struct ParseRestartCauseError(String);

impl RestartCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartCause::PowerOn => "power-on",
            RestartCause::SoftwareReset => "software-reset",
            RestartCause::Panic => "panic",
            RestartCause::Watchdog => "watchdog",
            RestartCause::Brownout => "brownout",
            RestartCause::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RestartCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RestartCause {
    type Err = ParseRestartCauseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "power-on" | "poweron" => Ok(RestartCause::PowerOn),
            "software-reset" | "sw-reset" => Ok(RestartCause::SoftwareReset),
            "panic" => Ok(RestartCause::Panic),
            "watchdog" | "wdt" => Ok(RestartCause::Watchdog),
            "brownout" => Ok(RestartCause::Brownout),
            "unknown" => Ok(RestartCause::Unknown),
            _ => Err(ParseRestartCauseError(s.to_string())),
        }
    }
}

/// Produced by the platform at boot, read-only for the rest of the boot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartRecord {
    pub cause: RestartCause,
    /// Platform specific details, e.g. "Cache disabled".
    pub reason: Option<String>,
    /// The core a fault originated on, if the restart was caused by a fault.
    pub origin_core: Option<LogicalCoreId>,
    pub recorded_at: DateTime<Utc>,
}

impl RestartRecord {
    pub fn power_on() -> Self {
        Self {
            cause: RestartCause::PowerOn,
            reason: None,
            origin_core: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn fault(
        cause: RestartCause,
        reason: impl Into<String>,
        origin_core: Option<LogicalCoreId>,
    ) -> Self {
        Self {
            cause,
            reason: Some(reason.into()),
            origin_core,
            recorded_at: Utc::now(),
        }
    }
}

/// Answers why the current boot happened.
pub trait RestartOracle: Send + Sync {
    /// The record is captured once at boot and stays the same until the next restart.
    fn last_restart(&self) -> &RestartRecord;
}

impl std::fmt::Display for RestartRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cause)?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        if let Some(core_id) = self.origin_core {
            write!(f, " on core {core_id}")?;
        }
        Ok(())
    }
}
