// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Event Sum Type
//!
//! Past tense naming, one payload struct per variant, all payloads carry the
//! instance id, version and timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{InstanceId, InstanceStatus, Registration};

/// Instance Domain Events
///
/// Equality is structural over every field, which is what the event log
/// compare-and-swap relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstanceEvent {
    /// Instance registered (first time, or again after deregistration)
    Registered(InstanceRegistered),

    /// A registered instance submitted a different registration
    RegistrationUpdated(InstanceRegistrationUpdated),

    /// Probed health status changed
    StatusChanged(InstanceStatusChanged),

    /// Instance left the registry; its log is retained
    Deregistered(InstanceDeregistered),
}

/// Instance was registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRegistered {
    pub instance_id: InstanceId,
    pub version: u64,
    pub timestamp: DateTime<Utc>,

    /// Submitted registration
    pub registration: Registration,
}

/// Registration of an already registered instance changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRegistrationUpdated {
    pub instance_id: InstanceId,
    pub version: u64,
    pub timestamp: DateTime<Utc>,

    /// Replacement registration
    pub registration: Registration,
}

/// Health status of the instance changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStatusChanged {
    pub instance_id: InstanceId,
    pub version: u64,
    pub timestamp: DateTime<Utc>,

    /// New status
    pub status: InstanceStatus,
}

/// Instance was deregistered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDeregistered {
    pub instance_id: InstanceId,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

impl InstanceEvent {
    pub fn registered(
        instance_id: InstanceId,
        version: u64,
        timestamp: DateTime<Utc>,
        registration: Registration,
    ) -> Self {
        InstanceEvent::Registered(InstanceRegistered {
            instance_id,
            version,
            timestamp,
            registration,
        })
    }

    pub fn registration_updated(
        instance_id: InstanceId,
        version: u64,
        timestamp: DateTime<Utc>,
        registration: Registration,
    ) -> Self {
        InstanceEvent::RegistrationUpdated(InstanceRegistrationUpdated {
            instance_id,
            version,
            timestamp,
            registration,
        })
    }

    pub fn status_changed(
        instance_id: InstanceId,
        version: u64,
        timestamp: DateTime<Utc>,
        status: InstanceStatus,
    ) -> Self {
        InstanceEvent::StatusChanged(InstanceStatusChanged {
            instance_id,
            version,
            timestamp,
            status,
        })
    }

    pub fn deregistered(instance_id: InstanceId, version: u64, timestamp: DateTime<Utc>) -> Self {
        InstanceEvent::Deregistered(InstanceDeregistered {
            instance_id,
            version,
            timestamp,
        })
    }

    /// Instance this event belongs to
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            InstanceEvent::Registered(e) => &e.instance_id,
            InstanceEvent::RegistrationUpdated(e) => &e.instance_id,
            InstanceEvent::StatusChanged(e) => &e.instance_id,
            InstanceEvent::Deregistered(e) => &e.instance_id,
        }
    }

    /// Position of this event in its instance's log
    pub fn version(&self) -> u64 {
        match self {
            InstanceEvent::Registered(e) => e.version,
            InstanceEvent::RegistrationUpdated(e) => e.version,
            InstanceEvent::StatusChanged(e) => e.version,
            InstanceEvent::Deregistered(e) => e.version,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            InstanceEvent::Registered(e) => e.timestamp,
            InstanceEvent::RegistrationUpdated(e) => e.timestamp,
            InstanceEvent::StatusChanged(e) => e.timestamp,
            InstanceEvent::Deregistered(e) => e.timestamp,
        }
    }

    /// Registration carried by the event, if any
    pub fn registration(&self) -> Option<&Registration> {
        match self {
            InstanceEvent::Registered(e) => Some(&e.registration),
            InstanceEvent::RegistrationUpdated(e) => Some(&e.registration),
            InstanceEvent::StatusChanged(_) | InstanceEvent::Deregistered(_) => None,
        }
    }

    /// Snake case event type name (used for NATS subjects)
    pub fn event_type_name(&self) -> &'static str {
        match self {
            InstanceEvent::Registered(_) => "registered",
            InstanceEvent::RegistrationUpdated(_) => "registration_updated",
            InstanceEvent::StatusChanged(_) => "status_changed",
            InstanceEvent::Deregistered(_) => "deregistered",
        }
    }
}
