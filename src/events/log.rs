// Copyright (c) 2025 - Cowboy AI, Inc.
//! Per-Instance Event Log
//!
//! The log is the unit stored under an instance id and the unit compared by
//! the store's compare-and-swap. It is never mutated in place: appending
//! produces a new log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::instance::InstanceEvent;

/// Contiguity violation found by [`EventLog::verify_versions`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event at position {position} has version {found}, expected {expected}")]
pub struct VersionGap {
    pub position: usize,
    pub expected: u64,
    pub found: u64,
}

/// Ordered, append-only sequence of events for one instance
///
/// Equality is element-wise over the event sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<InstanceEvent>,
}

impl EventLog {
    /// Empty log (what the store returns for an unknown id)
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap events that are already in version order
    pub fn from_events(events: Vec<InstanceEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[InstanceEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstanceEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&InstanceEvent> {
        self.events.last()
    }

    /// Version the next appended event must carry
    ///
    /// Equals the log length for a log whose versions start at 0.
    pub fn next_version(&self) -> u64 {
        self.events.last().map(|e| e.version() + 1).unwrap_or(0)
    }

    /// Registration carried by the most recent Registered/RegistrationUpdated event
    pub fn latest_registration(&self) -> Option<&crate::domain::Registration> {
        self.events.iter().rev().find_map(InstanceEvent::registration)
    }

    /// New log with `event` at the end; `self` is left untouched
    pub fn appended(&self, event: InstanceEvent) -> EventLog {
        let mut events = Vec::with_capacity(self.events.len() + 1);
        events.extend(self.events.iter().cloned());
        events.push(event);
        EventLog { events }
    }

    /// Check that versions run 0, 1, 2, … without gaps
    pub fn verify_versions(&self) -> Result<(), VersionGap> {
        for (position, event) in self.events.iter().enumerate() {
            let expected = position as u64;
            if event.version() != expected {
                return Err(VersionGap {
                    position,
                    expected,
                    found: event.version(),
                });
            }
        }
        Ok(())
    }

    pub fn into_events(self) -> Vec<InstanceEvent> {
        self.events
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a InstanceEvent;
    type IntoIter = std::slice::Iter<'a, InstanceEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
