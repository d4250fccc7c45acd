// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Domain Events
//!
//! Events are immutable facts about a registered instance. They form a
//! closed set: an instance is registered, its registration is updated, its
//! status changes, or it is deregistered.
//!
//! # Versioning
//!
//! Every event carries the per-instance version it was appended at. Versions
//! start at 0 and grow by exactly one per appended event, so the version of
//! an event is also its position in the instance's [`EventLog`].
//!
//! # Event Flow
//!
//! ```text
//! Command → handle_*() → InstanceEvent → EventLogStore (CAS) → EventPublisher
//! ```
//!
//! # Module Organization
//!
//! - [`instance`] - The event sum type and its payloads
//! - [`log`] - The ordered, append-only per-instance log

pub mod instance;
pub mod log;

pub use instance::{
    InstanceDeregistered, InstanceEvent, InstanceRegistered, InstanceRegistrationUpdated,
    InstanceStatusChanged,
};
pub use log::{EventLog, VersionGap};
