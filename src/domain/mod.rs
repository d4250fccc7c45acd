// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Registry Domain Models
//!
//! Value objects describing a registered service instance.
//!
//! - [`InstanceId`] - Opaque identifier, equality by value
//! - [`Registration`] - What an instance tells the registry about itself
//! - [`InstanceStatus`] - Health status reported by probes
//! - [`InstanceIdGenerator`] - Derives ids for new registrations

pub mod instance_id;
pub mod registration;
pub mod status;

pub use instance_id::{
    HashingInstanceIdGenerator, InstanceId, InstanceIdGenerator, RandomInstanceIdGenerator,
};
pub use registration::{Metadata, Registration, RegistrationBuilder, RegistrationError};
pub use status::InstanceStatus;
