// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Log Store Abstraction
//!
//! This module defines the storage capability the registry needs: a map from
//! instance id to that instance's [`EventLog`], with an atomic
//! compare-and-swap on the whole log value.
//!
//! # Architecture
//!
//! ```text
//! Command → Aggregate → Event → EventLogStore::append (CAS) → Publisher
//!                                      ↓
//!                     InMemory | Serialized | NATS KV
//! ```
//!
//! # Store Requirements
//!
//! 1. **Append-Only**: Logs only ever grow, except through retention
//! 2. **Ordered**: Insertion order defines version order
//! 3. **Atomic CAS**: `replace` succeeds only if the stored value still
//!    equals the expected value
//! 4. **Structural Equality**: The comparison is by value (`PartialEq`), never
//!    by identity or raw serialized bytes. Backends that serialize must
//!    deserialize the stored value and compare that.
//! 5. **Absent = Empty**: an unknown id reads as, and compares equal to, the
//!    empty log
//!
//! # Backend Selection
//!
//! The backend is chosen once at process start from
//! [`RegistryConfig`](crate::config::RegistryConfig) by
//! [`InstanceRegistry::from_config`](crate::service::InstanceRegistry::from_config).

use async_trait::async_trait;

use crate::aggregate::InstanceAggregate;
use crate::domain::InstanceId;
use crate::errors::{RegistryError, RegistryResult};
use crate::events::{EventLog, InstanceEvent};

pub mod memory;
pub mod nats;
pub mod serialized;

pub use memory::InMemoryEventLogStore;
pub use nats::NatsKvEventLogStore;
pub use serialized::SerializedEventLogStore;

/// Key-value capability over per-instance event logs
///
/// Implementations must make `get`, `compute_if_absent`, `replace` and
/// `remove` each atomic per call. Different ids must not block each other
/// beyond the duration of a single call.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Read the log for an instance
    ///
    /// Returns the empty log for unknown ids; never errors for them.
    async fn get(&self, id: &InstanceId) -> RegistryResult<EventLog>;

    /// Read the log, storing `default` first if the id is absent
    async fn compute_if_absent(&self, id: &InstanceId, default: EventLog) -> RegistryResult<EventLog>;

    /// Atomically swap `expected` for `new`
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the stored value was structurally equal to `expected`
    ///   and has been replaced
    /// - `Ok(false)` if another writer changed it first (nothing written)
    /// - `Err(StoreUnavailable)` on backend failure
    async fn replace(&self, id: &InstanceId, expected: &EventLog, new: EventLog) -> RegistryResult<bool>;

    /// Ids whose log is non-empty
    async fn ids(&self) -> RegistryResult<Vec<InstanceId>>;

    /// Atomically drop the log if it still equals `expected`
    ///
    /// Only retention calls this; the registry itself never deletes.
    async fn remove(&self, id: &InstanceId, expected: &EventLog) -> RegistryResult<bool>;

    /// Append `event` to `expected`, failing if someone else appended first
    ///
    /// The event must carry `expected.next_version()`.
    async fn append(
        &self,
        id: &InstanceId,
        event: InstanceEvent,
        expected: &EventLog,
    ) -> RegistryResult<bool> {
        let next = expected.next_version();
        if event.version() != next {
            return Err(RegistryError::VersionMismatch {
                instance_id: id.clone(),
                expected: next,
                actual: event.version(),
            });
        }
        self.replace(id, expected, expected.appended(event)).await
    }

    /// Ids whose current registration carries `name`
    ///
    /// Default implementation scans every log; backends with a secondary
    /// index override it.
    async fn find_by_name(&self, name: &str) -> RegistryResult<Vec<InstanceId>> {
        let mut found = Vec::new();
        for id in self.ids().await? {
            let log = self.get(&id).await?;
            let aggregate = InstanceAggregate::from_events(id.clone(), &log);
            if aggregate.name() == Some(name) {
                found.push(id);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Registration;
    use chrono::{DateTime, Utc};

    fn test_timestamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_append_rejects_wrong_version() {
        let store = InMemoryEventLogStore::new();
        let id = InstanceId::new("abc");
        let event = InstanceEvent::registered(
            id.clone(),
            1,
            test_timestamp(),
            Registration::create("foo", "http://health").build().unwrap(),
        );

        let result = store.append(&id, event, &EventLog::new()).await;

        assert!(matches!(
            result,
            Err(RegistryError::VersionMismatch { expected: 0, actual: 1, .. })
        ));
        assert!(store.get(&id).await.unwrap().is_empty());
    }
}
