// Copyright (c) 2025 - Cowboy AI, Inc.
//! Instance Registry Service
//!
//! Orchestrates the optimistic read-modify-write cycle against the event log
//! store. Every command goes through the same loop:
//!
//! ```text
//! get(id) → fold → handle (pure) → append (CAS) ──ok──→ publish
//!    ↑                                  │
//!    └────── backoff ←── lost race ─────┘
//! ```
//!
//! # Transaction Semantics
//!
//! - A handler returning `None` ends the loop without writing (idempotent
//!   command, nothing to append)
//! - A handler rejection ends the loop with `InvalidStateTransition`
//! - A lost CAS race reloads and decides again, at most
//!   `RetryPolicy::max_attempts` times in total
//! - Store failures end the loop immediately
//! - Publishing happens only after the append succeeded and never undoes it
//!
//! Dropping the returned future before the CAS succeeds leaves the store
//! untouched.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregate::commands::*;
use crate::aggregate::handlers::*;
use crate::aggregate::InstanceAggregate;
use crate::config::{RegistryConfig, RetryPolicy, StoreBackend};
use crate::domain::{
    HashingInstanceIdGenerator, InstanceId, InstanceIdGenerator, InstanceStatus, Registration,
};
use crate::errors::{RegistryError, RegistryResult};
use crate::event_store::{
    EventLogStore, InMemoryEventLogStore, NatsKvEventLogStore, SerializedEventLogStore,
};
use crate::events::{EventLog, InstanceEvent};
use crate::nats::NatsClient;
use crate::publisher::{BroadcastEventPublisher, EventPublisher, NatsEventPublisher};
use crate::retention::{EvictDeregistered, KeepAll, RetentionPolicy};
use crate::service::status::{HealthProbe, StatusUpdateTrigger, StatusUpdater};

/// Event-sourced registry of service instances
///
/// Cheap to clone; clones share the store, publisher and policies.
#[derive(Clone)]
pub struct InstanceRegistry {
    store: Arc<dyn EventLogStore>,
    publisher: Arc<dyn EventPublisher>,
    id_generator: Arc<dyn InstanceIdGenerator>,
    retention: Arc<dyn RetentionPolicy>,
    retry: RetryPolicy,
    registration_policy: RegistrationPolicy,
}

impl InstanceRegistry {
    /// Registry over `store` with a broadcast publisher and default policies
    pub fn new(store: Arc<dyn EventLogStore>) -> Self {
        Self {
            store,
            publisher: Arc::new(BroadcastEventPublisher::default()),
            id_generator: Arc::new(HashingInstanceIdGenerator),
            retention: Arc::new(KeepAll),
            retry: RetryPolicy::default(),
            registration_policy: RegistrationPolicy::default(),
        }
    }

    /// Wire store, publisher and policies from configuration
    ///
    /// The NATS KV backend shares its connection with a NATS publisher; the
    /// in-process backends publish on a broadcast channel.
    pub async fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let (store, publisher): (Arc<dyn EventLogStore>, Arc<dyn EventPublisher>) =
            match config.backend {
                StoreBackend::Memory => (
                    Arc::new(InMemoryEventLogStore::new()),
                    Arc::new(BroadcastEventPublisher::default()),
                ),
                StoreBackend::Serialized => (
                    Arc::new(SerializedEventLogStore::new()),
                    Arc::new(BroadcastEventPublisher::default()),
                ),
                StoreBackend::NatsKv => {
                    let client = NatsClient::new(config.nats.clone()).await?;
                    let store = NatsKvEventLogStore::with_client(&client, &config.kv).await?;
                    (
                        Arc::new(store),
                        Arc::new(NatsEventPublisher::new(client, config.subject_prefix.clone())),
                    )
                }
            };

        let retention: Arc<dyn RetentionPolicy> = match config.evict_deregistered_after {
            Some(after) => Arc::new(EvictDeregistered::new(after)),
            None => Arc::new(KeepAll),
        };

        info!(
            backend = %config.backend,
            max_attempts = config.retry.max_attempts,
            "Instance registry configured"
        );

        Ok(Self::new(store)
            .with_publisher(publisher)
            .with_retention(retention)
            .with_retry(config.retry.clone())
            .with_registration_policy(config.registration_policy))
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_id_generator(mut self, id_generator: Arc<dyn InstanceIdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn with_retention(mut self, retention: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_registration_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.registration_policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn EventLogStore> {
        &self.store
    }

    /// Start background status checks as configured
    ///
    /// Registrations are probed as they are published when the publisher has
    /// an in-process feed. `status_check_interval` adds a periodic re-check
    /// of every registered instance.
    pub fn spawn_status_trigger(
        &self,
        probe: Arc<dyn HealthProbe>,
        config: &RegistryConfig,
    ) -> JoinHandle<()> {
        let mut trigger = StatusUpdateTrigger::new(StatusUpdater::new(self.clone(), probe));
        if let Some(period) = config.status_check_interval {
            trigger = trigger.with_interval(period);
        }
        trigger.spawn(self.publisher.local_events())
    }

    // ---- commands ----

    /// Register an instance under `id`, or refresh its registration
    ///
    /// Resubmitting an identical registration appends nothing unless the
    /// registration policy is `AlwaysAppend`.
    pub async fn register(&self, id: InstanceId, registration: Registration) -> RegistryResult<InstanceId> {
        let policy = self.registration_policy;
        self.execute(&id, "register", true, |state, timestamp| {
            handle_register(
                state,
                RegisterInstanceCommand {
                    registration: registration.clone(),
                    timestamp,
                },
                policy,
            )
        })
        .await?;
        Ok(id)
    }

    /// Register under an id derived by the configured generator
    pub async fn register_new(&self, registration: Registration) -> RegistryResult<InstanceId> {
        let id = self.id_generator.generate_id(&registration);
        self.register(id, registration).await
    }

    /// Record a probed status; repeating the current status appends nothing
    pub async fn report_status(
        &self,
        id: &InstanceId,
        status: InstanceStatus,
    ) -> RegistryResult<Option<InstanceEvent>> {
        self.execute(id, "report_status", false, |state, timestamp| {
            handle_report_status(state, ReportStatusCommand { status, timestamp })
        })
        .await
    }

    /// Deregister an instance; its log is kept
    pub async fn deregister(&self, id: &InstanceId) -> RegistryResult<Option<InstanceEvent>> {
        self.execute(id, "deregister", false, |state, timestamp| {
            handle_deregister(state, DeregisterInstanceCommand { timestamp })
        })
        .await
    }

    // ---- queries ----

    /// Current state, or `None` if no event was ever stored for `id`
    pub async fn get_instance(&self, id: &InstanceId) -> RegistryResult<Option<InstanceAggregate>> {
        let log = self.store.get(id).await?;
        if log.is_empty() {
            return Ok(None);
        }
        Ok(Some(InstanceAggregate::from_events(id.clone(), &log)))
    }

    /// Every known instance, deregistered ones included
    pub async fn find_all(&self) -> RegistryResult<Vec<InstanceAggregate>> {
        let mut instances = Vec::new();
        for id in self.store.ids().await? {
            if let Some(instance) = self.get_instance(&id).await? {
                instances.push(instance);
            }
        }
        Ok(instances)
    }

    /// Currently registered instances carrying `name`
    pub async fn find_by_name(&self, name: &str) -> RegistryResult<Vec<InstanceAggregate>> {
        let mut instances = Vec::new();
        for id in self.store.find_by_name(name).await? {
            if let Some(instance) = self.get_instance(&id).await? {
                if instance.is_registered() && instance.name() == Some(name) {
                    instances.push(instance);
                }
            }
        }
        Ok(instances)
    }

    /// Raw event history of an instance (empty if unknown)
    pub async fn event_log(&self, id: &InstanceId) -> RegistryResult<EventLog> {
        self.store.get(id).await
    }

    // ---- retention ----

    /// Drop every log the retention policy selects as of `now`
    ///
    /// Instances written to while the round runs are skipped.
    pub async fn evict(&self, now: DateTime<Utc>) -> RegistryResult<Vec<InstanceId>> {
        let mut evicted = Vec::new();
        for id in self.store.ids().await? {
            let log = self.store.get(&id).await?;
            let aggregate = InstanceAggregate::from_events(id.clone(), &log);
            if !self.retention.should_evict(&aggregate, now) {
                continue;
            }
            if self.store.remove(&id, &log).await? {
                info!(instance_id = %id, "Evicted instance log");
                evicted.push(id);
            } else {
                debug!(instance_id = %id, "Instance changed during eviction, kept");
            }
        }
        Ok(evicted)
    }

    // ---- CAS loop ----

    async fn execute<F>(
        &self,
        id: &InstanceId,
        operation: &'static str,
        seed: bool,
        decide: F,
    ) -> RegistryResult<Option<InstanceEvent>>
    where
        F: Fn(&InstanceAggregate, DateTime<Utc>) -> Result<Option<InstanceEvent>, CommandError>,
    {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let log = if seed {
                self.store.compute_if_absent(id, EventLog::new()).await?
            } else {
                self.store.get(id).await?
            };
            let state = InstanceAggregate::from_events(id.clone(), &log);

            let event = match decide(&state, Utc::now()) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!(instance_id = %id, operation, "Nothing to append");
                    return Ok(None);
                }
                Err(source) => {
                    return Err(RegistryError::InvalidStateTransition {
                        instance_id: id.clone(),
                        source,
                    })
                }
            };

            if self.store.append(id, event.clone(), &log).await? {
                debug!(
                    instance_id = %id,
                    operation,
                    version = event.version(),
                    event_type = event.event_type_name(),
                    "Event appended"
                );
                self.publish(&event).await;
                return Ok(Some(event));
            }

            debug!(instance_id = %id, operation, attempt, "CAS conflict, reloading");
            if attempt < max_attempts {
                let backoff = self.retry.backoff_for(attempt);
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        warn!(
            instance_id = %id,
            operation,
            attempts = max_attempts,
            "Giving up after repeated CAS conflicts"
        );
        Err(RegistryError::ConcurrencyConflictExhausted {
            instance_id: id.clone(),
            attempts: max_attempts,
        })
    }

    async fn publish(&self, event: &InstanceEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            warn!(
                instance_id = %event.instance_id(),
                event_type = event.event_type_name(),
                error = %e,
                "Failed to publish event; stored log is unaffected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Lifecycle;
    use pretty_assertions::assert_eq;

    fn registration(name: &str) -> Registration {
        Registration::create(name, "http://health").build().unwrap()
    }

    fn registry() -> InstanceRegistry {
        InstanceRegistry::new(Arc::new(InMemoryEventLogStore::new()))
            .with_retry(RetryPolicy::immediate(5))
    }

    #[tokio::test]
    async fn test_register_then_query() {
        let registry = registry();
        let id = registry.register_new(registration("foo")).await.unwrap();

        let instance = registry.get_instance(&id).await.unwrap().unwrap();
        assert_eq!(instance.lifecycle, Lifecycle::Registered);
        assert_eq!(instance.name(), Some("foo"));
        assert_eq!(instance.version, 1);
    }

    #[tokio::test]
    async fn test_identical_registration_appends_once() {
        let registry = registry();
        let id = InstanceId::new("abc");

        registry.register(id.clone(), registration("foo")).await.unwrap();
        registry.register(id.clone(), registration("foo")).await.unwrap();

        assert_eq!(registry.event_log(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_always_append_records_refresh() {
        let registry = registry().with_registration_policy(RegistrationPolicy::AlwaysAppend);
        let id = InstanceId::new("abc");

        registry.register(id.clone(), registration("foo")).await.unwrap();
        registry.register(id.clone(), registration("foo")).await.unwrap();

        let log = registry.event_log(&id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(matches!(log.events()[1], InstanceEvent::RegistrationUpdated(_)));
    }

    #[tokio::test]
    async fn test_status_on_unknown_instance_is_rejected() {
        let registry = registry();
        let result = registry
            .report_status(&InstanceId::new("nobody"), InstanceStatus::Up)
            .await;

        assert!(matches!(
            result,
            Err(RegistryError::InvalidStateTransition {
                source: CommandError::NotRegistered,
                ..
            })
        ));
        assert!(registry.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deregister_twice_is_noop() {
        let registry = registry();
        let id = InstanceId::new("abc");
        registry.register(id.clone(), registration("foo")).await.unwrap();

        assert!(registry.deregister(&id).await.unwrap().is_some());
        assert!(registry.deregister(&id).await.unwrap().is_none());
        assert_eq!(registry.event_log(&id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_name_skips_deregistered() {
        let registry = registry();
        let a = InstanceId::new("a");
        let b = InstanceId::new("b");
        registry.register(a.clone(), registration("foo")).await.unwrap();
        registry.register(b.clone(), registration("foo")).await.unwrap();
        registry.deregister(&b).await.unwrap();

        let found: Vec<InstanceId> = registry
            .find_by_name("foo")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(found, vec![a]);
        assert_eq!(registry.find_all().await.unwrap().len(), 2);
    }
}
