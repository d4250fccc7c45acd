// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for registry operations

use thiserror::Error;

use crate::aggregate::CommandError;
use crate::domain::{InstanceId, RegistrationError};

/// Errors that can occur in registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Backend failure on get or replace
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Compare-and-swap kept losing against concurrent writers
    #[error("Concurrency conflict on instance {instance_id}: gave up after {attempts} attempts")]
    ConcurrencyConflictExhausted {
        instance_id: InstanceId,
        attempts: u32,
    },

    /// Command is not valid for the instance's current state
    #[error("Invalid state transition for instance {instance_id}: {source}")]
    InvalidStateTransition {
        instance_id: InstanceId,
        #[source]
        source: CommandError,
    },

    /// Registration failed validation
    #[error("Invalid registration: {0}")]
    InvalidRegistration(#[from] RegistrationError),

    /// Event carries a version that does not continue the log
    #[error("Version mismatch on instance {instance_id}: expected {expected}, got {actual}")]
    VersionMismatch {
        instance_id: InstanceId,
        expected: u64,
        actual: u64,
    },

    /// Instance id cannot be used as a key by the selected backend
    #[error("Invalid instance id for this store: {0}")]
    InvalidInstanceId(String),

    /// NATS connection error
    #[error("NATS connection error: {0}")]
    NatsConnection(String),

    /// NATS publish error
    #[error("NATS publish error: {0}")]
    NatsPublish(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RegistryError {
    /// Whether a caller may reasonably retry the whole operation later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::StoreUnavailable(_)
                | RegistryError::ConcurrencyConflictExhausted { .. }
                | RegistryError::NatsConnection(_)
                | RegistryError::NatsPublish(_)
        )
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<async_nats::Error> for RegistryError {
    fn from(err: async_nats::Error) -> Self {
        RegistryError::NatsConnection(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}
