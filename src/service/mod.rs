// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for the Instance Registry
//!
//! # Architecture
//!
//! ```text
//! Client Request / Health Probe
//!     ↓
//! InstanceRegistry (this module)
//!     ↓
//! Command Handler → Aggregate → Event
//!     ↓
//! EventLogStore (CAS append, retried on conflict)
//!     ↓
//! EventPublisher (broadcast or NATS)
//!     ↓
//! StatusUpdateTrigger → StatusUpdater → report_status
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cim_instance_registry::domain::Registration;
//! use cim_instance_registry::event_store::InMemoryEventLogStore;
//! use cim_instance_registry::service::InstanceRegistry;
//!
//! # tokio_test::block_on(async {
//! let registry = InstanceRegistry::new(Arc::new(InMemoryEventLogStore::new()));
//! let registration = Registration::create("billing", "http://billing:8080/health").build()?;
//!
//! let id = registry.register_new(registration).await?;
//! let instance = registry.get_instance(&id).await?.expect("just registered");
//! assert_eq!(instance.name(), Some("billing"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod registry;
pub mod status;

pub use registry::InstanceRegistry;
pub use status::{HealthProbe, StatusUpdateTrigger, StatusUpdater};

#[cfg(feature = "http-probe")]
pub use status::HttpHealthProbe;
