// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Command Handlers for the Instance Aggregate
//!
//! ```text
//! handle_command(State, Command) → Result<Option<Event>, CommandError>
//! ```
//!
//! `Ok(None)` means the command is already satisfied by the current state.
//! The event version is always `state.version`, i.e. the next free slot of
//! the log the state was folded from.
//!
//! # Business Rules
//!
//! - Registering an unknown or deregistered instance yields `Registered`
//! - Registering with a different registration yields `RegistrationUpdated`
//! - Re-submitting an identical registration is a no-op under
//!   [`RegistrationPolicy::SkipIdentical`]
//! - Status reports need a registered instance; identical status is a no-op
//! - Deregistering needs a prior registration; repeating it is a no-op

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::aggregate::commands::*;
use crate::aggregate::instance::{InstanceAggregate, Lifecycle};
use crate::events::InstanceEvent;

/// Command validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Instance has never been registered
    #[error("Instance is not registered")]
    NotRegistered,

    /// Instance was deregistered; only a new registration revives it
    #[error("Instance is deregistered")]
    Deregistered,
}

/// What to do when an identical registration is submitted again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    /// Append nothing; the call still succeeds
    #[default]
    SkipIdentical,
    /// Append a `RegistrationUpdated` event anyway (audit trail of refreshes)
    AlwaysAppend,
}

impl FromStr for RegistrationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip_identical" | "skip-identical" => Ok(RegistrationPolicy::SkipIdentical),
            "always_append" | "always-append" => Ok(RegistrationPolicy::AlwaysAppend),
            other => Err(format!("unknown registration policy: {}", other)),
        }
    }
}

/// Handle RegisterInstance command
///
/// # Returns
/// - `Registered` when the instance is unregistered or deregistered
/// - `RegistrationUpdated` when the registration differs (or the policy
///   asks for an event on every refresh)
/// - `None` for an identical resubmission under `SkipIdentical`
pub fn handle_register(
    state: &InstanceAggregate,
    command: RegisterInstanceCommand,
    policy: RegistrationPolicy,
) -> Result<Option<InstanceEvent>, CommandError> {
    let id = state.id.clone();
    let version = state.version;

    match state.lifecycle {
        Lifecycle::Unregistered | Lifecycle::Deregistered => Ok(Some(InstanceEvent::registered(
            id,
            version,
            command.timestamp,
            command.registration,
        ))),
        Lifecycle::Registered => {
            let unchanged = state.registration.as_ref() == Some(&command.registration);
            if unchanged && policy == RegistrationPolicy::SkipIdentical {
                return Ok(None);
            }
            Ok(Some(InstanceEvent::registration_updated(
                id,
                version,
                command.timestamp,
                command.registration,
            )))
        }
    }
}

/// Handle ReportStatus command
///
/// # Business Rules
/// - Instance must be registered
/// - Reporting the current status again appends nothing
pub fn handle_report_status(
    state: &InstanceAggregate,
    command: ReportStatusCommand,
) -> Result<Option<InstanceEvent>, CommandError> {
    match state.lifecycle {
        Lifecycle::Unregistered => Err(CommandError::NotRegistered),
        Lifecycle::Deregistered => Err(CommandError::Deregistered),
        Lifecycle::Registered if state.status == command.status => Ok(None),
        Lifecycle::Registered => Ok(Some(InstanceEvent::status_changed(
            state.id.clone(),
            state.version,
            command.timestamp,
            command.status,
        ))),
    }
}

/// Handle DeregisterInstance command
///
/// # Business Rules
/// - Instance must have been registered at some point
/// - Deregistering twice appends nothing
pub fn handle_deregister(
    state: &InstanceAggregate,
    command: DeregisterInstanceCommand,
) -> Result<Option<InstanceEvent>, CommandError> {
    match state.lifecycle {
        Lifecycle::Unregistered => Err(CommandError::NotRegistered),
        Lifecycle::Deregistered => Ok(None),
        Lifecycle::Registered => Ok(Some(InstanceEvent::deregistered(
            state.id.clone(),
            state.version,
            command.timestamp,
        ))),
    }
}
