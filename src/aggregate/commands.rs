// Copyright (c) 2025 - Cowboy AI, Inc.
//! Commands for the Instance Aggregate
//!
//! Commands express intent and can be rejected; events express facts.
//! All commands include an explicit `timestamp`.

use chrono::{DateTime, Utc};

use crate::domain::{InstanceStatus, Registration};

/// Register an instance, or refresh an existing registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInstanceCommand {
    /// Registration as submitted by the instance
    pub registration: Registration,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,
}

/// Report the probed health status of an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportStatusCommand {
    pub status: InstanceStatus,
    pub timestamp: DateTime<Utc>,
}

/// Remove an instance from the registry (the log is kept)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeregisterInstanceCommand {
    pub timestamp: DateTime<Utc>,
}
