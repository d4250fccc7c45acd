// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Identifier Value Object

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::registration::Registration;

/// Opaque, immutable identifier of a registered instance
///
/// Serialized as a plain string so it can be used directly as a store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Wrap an existing identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Uuid> for InstanceId {
    fn from(value: Uuid) -> Self {
        Self(value.simple().to_string())
    }
}

/// Derives the id under which a registration is stored
pub trait InstanceIdGenerator: Send + Sync {
    /// Produce an id for the given registration
    fn generate_id(&self, registration: &Registration) -> InstanceId;
}

/// Name-based UUID (v5) over the health URL
///
/// An instance that re-registers with the same health URL, e.g. after a
/// restart of either side, lands on the same event log.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingInstanceIdGenerator;

impl InstanceIdGenerator for HashingInstanceIdGenerator {
    fn generate_id(&self, registration: &Registration) -> InstanceId {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, registration.health_url().as_bytes()).into()
    }
}

/// Fresh time-ordered UUID (v7) for every registration
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInstanceIdGenerator;

impl InstanceIdGenerator for RandomInstanceIdGenerator {
    fn generate_id(&self, _registration: &Registration) -> InstanceId {
        Uuid::now_v7().into()
    }
}
