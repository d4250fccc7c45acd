// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Instance Aggregate
//!
//! This module provides the functional aggregate pattern for the registry:
//! - State reconstruction via event folding: [Event] → State
//! - Command handlers as pure functions: (State, Command) → Result<Option<Event>, Error>
//! - No mutations, no side effects, no clock reads
//!
//! # Fold Pattern
//!
//! ```rust,ignore
//! let initial = InstanceAggregate::empty(id);
//! let state = log.iter().fold(initial, apply_event);
//! ```
//!
//! # Idempotent Commands
//!
//! Handlers return `Ok(None)` when the command would not change the state
//! (same registration resubmitted, same status reported again, instance
//! already deregistered). The service appends nothing in that case.
//!
//! # Time as Parameter
//!
//! Commands carry their timestamp; handlers never call `Utc::now()`, so
//! replaying the same commands yields the same events.

pub mod commands;
pub mod handlers;
pub mod instance;

pub use commands::*;
pub use handlers::*;
pub use instance::{apply_event, InstanceAggregate, Lifecycle};
