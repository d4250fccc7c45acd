// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Instance Aggregate
//!
//! ```text
//! EventLog → fold(apply_event) → InstanceAggregate
//! ```
//!
//! The aggregate is derived and never persisted. Folding the same log
//! always yields the same aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, InstanceStatus, Registration};
use crate::events::{EventLog, InstanceEvent};

/// Where an instance is in its registration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// No registration event seen yet
    #[default]
    Unregistered,
    /// Registered and not deregistered since
    Registered,
    /// Last lifecycle event was a deregistration
    Deregistered,
}

/// Immutable instance state reconstructed from events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAggregate {
    /// Instance id
    pub id: InstanceId,

    /// Number of events applied; also the version of the next event
    pub version: u64,

    /// Latest registration (kept after deregistration for display)
    pub registration: Option<Registration>,

    /// Latest probed status
    pub status: InstanceStatus,

    /// Lifecycle state
    pub lifecycle: Lifecycle,

    /// Timestamp of the latest Registered event
    pub registered_at: Option<DateTime<Utc>>,

    /// Timestamp of the latest event of any kind
    pub updated_at: Option<DateTime<Utc>>,
}

impl InstanceAggregate {
    /// Initial state for event folding
    pub fn empty(id: InstanceId) -> Self {
        Self {
            id,
            version: 0,
            registration: None,
            status: InstanceStatus::Unknown,
            lifecycle: Lifecycle::Unregistered,
            registered_at: None,
            updated_at: None,
        }
    }

    /// Reconstruct state from an event log
    ///
    /// ```text
    /// State = fold(Events, empty(id), apply_event)
    /// ```
    pub fn from_events(id: InstanceId, log: &EventLog) -> Self {
        log.iter().fold(Self::empty(id), apply_event)
    }

    /// Currently registered (not unregistered, not deregistered)
    pub fn is_registered(&self) -> bool {
        self.lifecycle == Lifecycle::Registered
    }

    pub fn is_deregistered(&self) -> bool {
        self.lifecycle == Lifecycle::Deregistered
    }

    /// At least one event has been applied
    pub fn is_initialized(&self) -> bool {
        self.version > 0
    }

    pub fn name(&self) -> Option<&str> {
        self.registration.as_ref().map(Registration::name)
    }
}

/// Apply event to state (pure function)
///
/// # Invariants
/// - Same event + same state = same result
/// - Never fails (events are facts that happened)
/// - Version advances to `event.version + 1`
pub fn apply_event(state: InstanceAggregate, event: &InstanceEvent) -> InstanceAggregate {
    let version = event.version() + 1;
    let updated_at = Some(event.timestamp());

    match event {
        InstanceEvent::Registered(e) => InstanceAggregate {
            version,
            registration: Some(e.registration.clone()),
            status: InstanceStatus::Unknown,
            lifecycle: Lifecycle::Registered,
            registered_at: Some(e.timestamp),
            updated_at,
            ..state
        },

        InstanceEvent::RegistrationUpdated(e) => InstanceAggregate {
            version,
            registration: Some(e.registration.clone()),
            status: InstanceStatus::Unknown,
            lifecycle: Lifecycle::Registered,
            updated_at,
            ..state
        },

        InstanceEvent::StatusChanged(e) => InstanceAggregate {
            version,
            status: e.status,
            updated_at,
            ..state
        },

        InstanceEvent::Deregistered(_) => InstanceAggregate {
            version,
            status: InstanceStatus::Unknown,
            lifecycle: Lifecycle::Deregistered,
            updated_at,
            ..state
        },
    }
}
