// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Health Status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health status of a registered instance
///
/// A freshly registered (or re-registered) instance is `Unknown` until the
/// first probe reports otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    #[default]
    Unknown,
    Up,
    Down,
    Offline,
    Restricted,
    OutOfService,
}

impl InstanceStatus {
    /// Upper snake case name, as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Unknown => "UNKNOWN",
            InstanceStatus::Up => "UP",
            InstanceStatus::Down => "DOWN",
            InstanceStatus::Offline => "OFFLINE",
            InstanceStatus::Restricted => "RESTRICTED",
            InstanceStatus::OutOfService => "OUT_OF_SERVICE",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNKNOWN" => Ok(InstanceStatus::Unknown),
            "UP" => Ok(InstanceStatus::Up),
            "DOWN" => Ok(InstanceStatus::Down),
            "OFFLINE" => Ok(InstanceStatus::Offline),
            "RESTRICTED" => Ok(InstanceStatus::Restricted),
            "OUT_OF_SERVICE" => Ok(InstanceStatus::OutOfService),
            other => Err(format!("unknown instance status: {}", other)),
        }
    }
}
