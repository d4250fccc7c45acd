// Copyright (c) 2025 - Cowboy AI, Inc.
//! Retention policies
//!
//! Event logs are append-only and nothing in the normal command path ever
//! deletes them. A retention policy is the one sanctioned way to drop a log:
//! [`InstanceRegistry::evict`](crate::service::InstanceRegistry::evict) asks
//! the policy about every folded aggregate and removes the chosen logs with a
//! compare-and-swap, so an instance written to concurrently survives the
//! round.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::aggregate::InstanceAggregate;

/// Decides which instance logs may be dropped
pub trait RetentionPolicy: Send + Sync {
    fn should_evict(&self, aggregate: &InstanceAggregate, now: DateTime<Utc>) -> bool;
}

/// Never evict anything
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl RetentionPolicy for KeepAll {
    fn should_evict(&self, _aggregate: &InstanceAggregate, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Evict instances that have been deregistered for at least `after`
#[derive(Debug, Clone, Copy)]
pub struct EvictDeregistered {
    pub after: Duration,
}

impl EvictDeregistered {
    pub fn new(after: Duration) -> Self {
        Self { after }
    }
}

impl RetentionPolicy for EvictDeregistered {
    fn should_evict(&self, aggregate: &InstanceAggregate, now: DateTime<Utc>) -> bool {
        if !aggregate.is_deregistered() {
            return false;
        }
        // A deregistered instance accepts no further events, so the last
        // update is the deregistration itself
        let Some(since) = aggregate.updated_at else {
            return false;
        };
        match chrono::Duration::from_std(self.after) {
            Ok(after) => now - since >= after,
            Err(_) => false,
        }
    }
}
