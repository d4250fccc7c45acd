// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subject hierarchy for registry events
//!
//! # Subject Pattern
//!
//! ```text
//! {prefix}.{instance_id}.{event_type}
//! ```
//!
//! With the default prefix this allows:
//! - Per-event subscriptions (`registry.instances.*.status_changed`)
//! - Per-instance wildcards (`registry.instances.<id>.>`)
//! - Global subscriptions (`registry.instances.>`)
//!
//! # Examples
//!
//! ```rust
//! use cim_instance_registry::subjects::Subjects;
//!
//! let subjects = Subjects::new("registry.instances");
//! assert_eq!(subjects.all(), "registry.instances.>");
//! ```

use std::fmt;

use crate::config::DEFAULT_SUBJECT_PREFIX;
use crate::events::InstanceEvent;

/// Registry event types as they appear in subjects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Registered,
    RegistrationUpdated,
    StatusChanged,
    Deregistered,
}

impl EventKind {
    pub fn of(event: &InstanceEvent) -> Self {
        match event {
            InstanceEvent::Registered(_) => EventKind::Registered,
            InstanceEvent::RegistrationUpdated(_) => EventKind::RegistrationUpdated,
            InstanceEvent::StatusChanged(_) => EventKind::StatusChanged,
            InstanceEvent::Deregistered(_) => EventKind::Deregistered,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Registered => write!(f, "registered"),
            EventKind::RegistrationUpdated => write!(f, "registration_updated"),
            EventKind::StatusChanged => write!(f, "status_changed"),
            EventKind::Deregistered => write!(f, "deregistered"),
        }
    }
}

/// Replace characters NATS treats as separators or wildcards
///
/// An id like `a.b` would otherwise add a subject level.
pub fn sanitize_token(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Subject hierarchy under one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subjects {
    prefix: String,
}

impl Subjects {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Subject an event is published on; the id stays a single token
    pub fn event(&self, event: &InstanceEvent) -> String {
        format!(
            "{}.{}.{}",
            self.prefix,
            sanitize_token(event.instance_id().as_str()),
            EventKind::of(event)
        )
    }

    /// Every registry event: `{prefix}.>`
    pub fn all(&self) -> String {
        format!("{}.>", self.prefix)
    }
}

impl Default for Subjects {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT_PREFIX)
    }
}
