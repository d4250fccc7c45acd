// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-instance-registry
//!
//! Deterministic registrations and timestamps, plus store, publisher and
//! probe doubles for driving the registry into conflict and failure paths.
//!
//! # Design Principles
//! - Ids and timestamps are fixed constants
//! - Doubles wrap the real in-memory store rather than re-implementing it
//! - Each integration suite pulls in only what it uses

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cim_instance_registry::config::RetryPolicy;
use cim_instance_registry::domain::{InstanceId, InstanceStatus, Registration};
use cim_instance_registry::errors::{RegistryError, RegistryResult};
use cim_instance_registry::event_store::{EventLogStore, InMemoryEventLogStore};
use cim_instance_registry::events::{EventLog, InstanceEvent};
use cim_instance_registry::publisher::EventPublisher;
use cim_instance_registry::service::HealthProbe;

pub const INSTANCE_ID_1: &str = "0c4a7d1e5f2b5c3d9e8f7a6b5c4d3e2f";
pub const INSTANCE_ID_2: &str = "1d5b8e2f6a3c5d4e8f9a0b1c2d3e4f5a";

pub const HEALTH_URL: &str = "http://health";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

pub fn instance_id() -> InstanceId {
    InstanceId::new(INSTANCE_ID_1)
}

/// `foo` at `http://health` with a single `dummy` metadata entry
pub fn registration(dummy: &str) -> Registration {
    Registration::create("foo", HEALTH_URL)
        .metadata("dummy", dummy)
        .build()
        .expect("Invalid registration in test fixture")
}

pub fn named_registration(name: &str, health_url: &str) -> Registration {
    Registration::create(name, health_url)
        .build()
        .expect("Invalid registration in test fixture")
}

/// Retry policy without sleeps
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::immediate(max_attempts)
}

/// Retry policy with small real backoff, for concurrency tests
pub fn short_backoff_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(8),
    }
}

/// Event types of a log, in order
pub fn event_types(log: &EventLog) -> Vec<&'static str> {
    log.iter().map(InstanceEvent::event_type_name).collect()
}

pub fn versions(log: &EventLog) -> Vec<u64> {
    log.iter().map(InstanceEvent::version).collect()
}

/// Store whose first `conflicts` replace calls report a lost race
pub struct ConflictingStore {
    inner: InMemoryEventLogStore,
    remaining: AtomicU32,
    replace_calls: AtomicU32,
}

impl ConflictingStore {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryEventLogStore::new(),
            remaining: AtomicU32::new(conflicts),
            replace_calls: AtomicU32::new(0),
        }
    }

    pub fn always() -> Self {
        Self::new(u32::MAX)
    }

    pub fn replace_calls(&self) -> u32 {
        self.replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventLogStore for ConflictingStore {
    async fn get(&self, id: &InstanceId) -> RegistryResult<EventLog> {
        self.inner.get(id).await
    }

    async fn compute_if_absent(&self, id: &InstanceId, default: EventLog) -> RegistryResult<EventLog> {
        self.inner.compute_if_absent(id, default).await
    }

    async fn replace(&self, id: &InstanceId, expected: &EventLog, new: EventLog) -> RegistryResult<bool> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Ok(false);
        }
        self.inner.replace(id, expected, new).await
    }

    async fn ids(&self) -> RegistryResult<Vec<InstanceId>> {
        self.inner.ids().await
    }

    async fn remove(&self, id: &InstanceId, expected: &EventLog) -> RegistryResult<bool> {
        self.inner.remove(id, expected).await
    }
}

/// Store whose backend is down
pub struct UnavailableStore;

#[async_trait]
impl EventLogStore for UnavailableStore {
    async fn get(&self, _id: &InstanceId) -> RegistryResult<EventLog> {
        Err(RegistryError::StoreUnavailable("connection refused".to_string()))
    }

    async fn compute_if_absent(&self, _id: &InstanceId, _default: EventLog) -> RegistryResult<EventLog> {
        Err(RegistryError::StoreUnavailable("connection refused".to_string()))
    }

    async fn replace(&self, _id: &InstanceId, _expected: &EventLog, _new: EventLog) -> RegistryResult<bool> {
        Err(RegistryError::StoreUnavailable("connection refused".to_string()))
    }

    async fn ids(&self) -> RegistryResult<Vec<InstanceId>> {
        Err(RegistryError::StoreUnavailable("connection refused".to_string()))
    }

    async fn remove(&self, _id: &InstanceId, _expected: &EventLog) -> RegistryResult<bool> {
        Err(RegistryError::StoreUnavailable("connection refused".to_string()))
    }
}

/// Publisher that always fails, counting attempts
#[derive(Default)]
pub struct FailingPublisher {
    attempts: AtomicU32,
}

impl FailingPublisher {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &InstanceEvent) -> RegistryResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(RegistryError::NatsPublish("no responders".to_string()))
    }
}

/// Probe answering per health URL; unknown URLs are OFFLINE
#[derive(Default)]
pub struct ScriptedProbe {
    answers: Mutex<HashMap<String, InstanceStatus>>,
}

impl ScriptedProbe {
    pub fn answering(health_url: &str, status: InstanceStatus) -> Arc<Self> {
        let probe = Self::default();
        probe.set(health_url, status);
        Arc::new(probe)
    }

    pub fn set(&self, health_url: &str, status: InstanceStatus) {
        self.answers
            .lock()
            .expect("probe lock poisoned")
            .insert(health_url.to_string(), status);
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, registration: &Registration) -> InstanceStatus {
        self.answers
            .lock()
            .expect("probe lock poisoned")
            .get(registration.health_url())
            .copied()
            .unwrap_or(InstanceStatus::Offline)
    }
}

/// Poll `store` until the log of `id` reaches `len` events
pub async fn wait_for_log_len(store: &Arc<dyn EventLogStore>, id: &InstanceId, len: usize) -> EventLog {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let log = store.get(id).await.expect("store read failed");
        if log.len() >= len || tokio::time::Instant::now() > deadline {
            return log;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
