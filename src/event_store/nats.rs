// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS JetStream Key-Value Event Log Store
//!
//! Each instance's event log is stored as one JSON value in a JetStream KV
//! bucket, keyed by instance id. The bucket's per-key revision gives us the
//! atomic primitive; structural equality is layered on top:
//!
//! 1. Read the entry and its revision
//! 2. Deserialize and compare with the expected log (by value)
//! 3. Write with `update(key, value, revision)`, revision 0 when absent
//!
//! If the conditional write reports an error, the key is read again. A
//! different revision holding exactly our log means the write landed anyway
//! (for example the reply timed out) and counts as success. A different
//! revision holding anything else means someone else won and we report
//! `Ok(false)`. An unchanged revision is surfaced as `StoreUnavailable`.
//!
//! Deleted and purged keys read as the empty log.

use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::config::KvStoreConfig;
use crate::domain::InstanceId;
use crate::errors::{RegistryError, RegistryResult};
use crate::event_store::EventLogStore;
use crate::events::EventLog;
use crate::nats::{NatsClient, NatsConfig};

/// JetStream KV-backed event log store
///
/// # Example
///
/// ```rust,no_run
/// use cim_instance_registry::config::KvStoreConfig;
/// use cim_instance_registry::event_store::NatsKvEventLogStore;
/// use cim_instance_registry::nats::NatsConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = NatsKvEventLogStore::connect(&NatsConfig::default(), &KvStoreConfig::default()).await?;
///     // Use store...
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NatsKvEventLogStore {
    kv: kv::Store,
    bucket: String,
}

impl NatsKvEventLogStore {
    /// Connect to NATS and open (or create) the bucket
    pub async fn connect(nats: &NatsConfig, config: &KvStoreConfig) -> RegistryResult<Self> {
        let client = NatsClient::new(nats.clone()).await?;
        Self::with_client(&client, config).await
    }

    /// Open the bucket over an existing connection
    pub async fn with_client(client: &NatsClient, config: &KvStoreConfig) -> RegistryResult<Self> {
        let jetstream = jetstream::new(client.inner().clone());

        let kv = match jetstream.get_key_value(&config.bucket).await {
            Ok(kv) => kv,
            Err(_) => {
                info!("Creating KV bucket {}", config.bucket);
                jetstream
                    .create_key_value(kv::Config {
                        bucket: config.bucket.clone(),
                        description: "Instance registry event logs".to_string(),
                        history: config.history,
                        storage: config.storage.into(),
                        num_replicas: config.replicas,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| RegistryError::StoreUnavailable(e.to_string()))?
            }
        };

        Ok(Self {
            kv,
            bucket: config.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Map an instance id to a KV key, rejecting ids the bucket cannot hold
    fn key(id: &InstanceId) -> RegistryResult<&str> {
        let key = id.as_str();
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.ends_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '=' | '.'));
        if valid {
            Ok(key)
        } else {
            Err(RegistryError::InvalidInstanceId(key.to_string()))
        }
    }

    /// Current log and revision; `None` when the key was never written
    async fn read(&self, key: &str) -> RegistryResult<Option<(EventLog, u64)>> {
        let entry = self
            .kv
            .entry(key)
            .await
            .map_err(|e| RegistryError::StoreUnavailable(e.to_string()))?;

        match entry {
            None => Ok(None),
            Some(entry) => {
                let log = match entry.operation {
                    kv::Operation::Put => serde_json::from_slice(&entry.value)
                        .map_err(|e| RegistryError::Deserialization(e.to_string()))?,
                    kv::Operation::Delete | kv::Operation::Purge => EventLog::new(),
                };
                Ok(Some((log, entry.revision)))
            }
        }
    }

    async fn revision(&self, key: &str) -> RegistryResult<Option<u64>> {
        Ok(self.read(key).await?.map(|(_, revision)| revision))
    }

    /// Conditional write of `new` against the revision observed in `seen`
    async fn write(&self, key: &str, seen: Option<u64>, new: &EventLog) -> RegistryResult<bool> {
        let payload = serde_json::to_vec(new)?;

        // Revision 0 only matches a key with no prior message
        match self.kv.update(key, payload.into(), seen.unwrap_or(0)).await {
            Ok(revision) => {
                debug!("Wrote {} at revision {}", key, revision);
                Ok(true)
            }
            Err(e) => {
                let reason = e.to_string();
                let after = self.read(key).await?;
                match settle_failed_write(seen, after, new) {
                    WriteOutcome::Applied => {
                        debug!("Write to {} reported {} but was applied", key, reason);
                        Ok(true)
                    }
                    WriteOutcome::Lost => {
                        debug!("Lost CAS race on {}: {}", key, reason);
                        Ok(false)
                    }
                    WriteOutcome::Failed => {
                        warn!("KV write to {} failed: {}", key, reason);
                        Err(RegistryError::StoreUnavailable(reason))
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteOutcome {
    Applied,
    Lost,
    Failed,
}

/// Decide what a rejected conditional write means from a fresh read
fn settle_failed_write(seen: Option<u64>, after: Option<(EventLog, u64)>, new: &EventLog) -> WriteOutcome {
    match after {
        Some((_, revision)) if Some(revision) == seen => WriteOutcome::Failed,
        None if seen.is_none() => WriteOutcome::Failed,
        Some((stored, _)) if &stored == new => WriteOutcome::Applied,
        _ => WriteOutcome::Lost,
    }
}

#[async_trait]
impl EventLogStore for NatsKvEventLogStore {
    async fn get(&self, id: &InstanceId) -> RegistryResult<EventLog> {
        let key = Self::key(id)?;
        Ok(self.read(key).await?.map(|(log, _)| log).unwrap_or_default())
    }

    async fn compute_if_absent(&self, id: &InstanceId, default: EventLog) -> RegistryResult<EventLog> {
        let key = Self::key(id)?;
        loop {
            match self.read(key).await? {
                Some((log, _)) if !log.is_empty() => return Ok(log),
                Some((_, revision)) => {
                    if default.is_empty() || self.write(key, Some(revision), &default).await? {
                        return Ok(default);
                    }
                }
                None => {
                    if default.is_empty() || self.write(key, None, &default).await? {
                        return Ok(default);
                    }
                }
            }
        }
    }

    async fn replace(&self, id: &InstanceId, expected: &EventLog, new: EventLog) -> RegistryResult<bool> {
        let key = Self::key(id)?;
        let (current, seen) = match self.read(key).await? {
            Some((log, revision)) => (log, Some(revision)),
            None => (EventLog::new(), None),
        };

        if &current != expected {
            return Ok(false);
        }
        self.write(key, seen, &new).await
    }

    async fn ids(&self) -> RegistryResult<Vec<InstanceId>> {
        let mut keys = self
            .kv
            .keys()
            .await
            .map_err(|e| RegistryError::StoreUnavailable(e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(key) = keys.next().await {
            let key = key.map_err(|e| RegistryError::StoreUnavailable(e.to_string()))?;
            // Removal writes an empty log, so the key may linger
            if let Some((log, _)) = self.read(&key).await? {
                if !log.is_empty() {
                    ids.push(InstanceId::new(key));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, id: &InstanceId, expected: &EventLog) -> RegistryResult<bool> {
        self.replace(id, expected, EventLog::new()).await
    }
}
