// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event-sourced instance registry for the Composable Information Machine
//!
//! Every registered service instance owns an append-only event log. The
//! current state of an instance is never stored; it is folded from that log
//! on demand. Writers coordinate optimistically with a compare-and-swap on
//! the whole log, retried on conflict, so no global lock is needed and
//! different instances never contend.
//!
//! # Modules
//!
//! - [`domain`]: registration, status and id value objects
//! - [`events`]: the four instance events and the per-instance log
//! - [`aggregate`]: pure fold and command handlers
//! - [`event_store`]: log store capability and its backends
//! - [`service`]: the registry CAS loop, queries and status probing
//! - [`publisher`]: post-append event delivery
//! - [`retention`]: eviction policies
//! - [`config`]: configuration and environment loading

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod errors;
pub mod event_store;
pub mod events;
pub mod nats;
pub mod publisher;
pub mod retention;
pub mod service;
pub mod subjects;

// Re-export commonly used types
pub use config::{RegistryConfig, RetryPolicy, StoreBackend};
pub use domain::{InstanceId, InstanceStatus, Registration};
pub use errors::{RegistryError, RegistryResult};
pub use event_store::EventLogStore;
pub use events::{EventLog, InstanceEvent};
pub use nats::{NatsClient, NatsConfig};
pub use service::InstanceRegistry;
