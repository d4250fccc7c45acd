// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hash-Backed In-Memory Event Log Store
//!
//! Logs are kept in a hash map keyed by instance id, with a secondary index
//! from registration name to the ids currently registered under it. Both
//! maps live behind one lock so the index can never disagree with the logs.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::InstanceId;
use crate::errors::RegistryResult;
use crate::event_store::EventLogStore;
use crate::events::EventLog;

#[derive(Debug, Default)]
struct Inner {
    logs: HashMap<InstanceId, EventLog>,
    by_name: HashMap<String, BTreeSet<InstanceId>>,
}

impl Inner {
    /// Store `new` under `id` (or drop the entry when empty) and fix the index
    fn put(&mut self, id: &InstanceId, new: EventLog) {
        let old_name = self
            .logs
            .get(id)
            .and_then(|log| log.latest_registration())
            .map(|r| r.name().to_string());
        let new_name = new.latest_registration().map(|r| r.name().to_string());

        if old_name != new_name {
            if let Some(name) = old_name {
                if let Some(ids) = self.by_name.get_mut(&name) {
                    ids.remove(id);
                    if ids.is_empty() {
                        self.by_name.remove(&name);
                    }
                }
            }
            if let Some(name) = new_name {
                self.by_name.entry(name).or_default().insert(id.clone());
            }
        }

        if new.is_empty() {
            self.logs.remove(id);
        } else {
            self.logs.insert(id.clone(), new);
        }
    }

    fn current(&self, id: &InstanceId) -> EventLog {
        self.logs.get(id).cloned().unwrap_or_default()
    }
}

/// In-process store with a by-name index
#[derive(Debug, Default)]
pub struct InMemoryEventLogStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLogStore for InMemoryEventLogStore {
    async fn get(&self, id: &InstanceId) -> RegistryResult<EventLog> {
        Ok(self.inner.read().await.current(id))
    }

    async fn compute_if_absent(&self, id: &InstanceId, default: EventLog) -> RegistryResult<EventLog> {
        let mut inner = self.inner.write().await;
        if let Some(log) = inner.logs.get(id) {
            return Ok(log.clone());
        }
        inner.put(id, default.clone());
        Ok(default)
    }

    async fn replace(&self, id: &InstanceId, expected: &EventLog, new: EventLog) -> RegistryResult<bool> {
        let mut inner = self.inner.write().await;
        let matches = match inner.logs.get(id) {
            Some(current) => current == expected,
            None => expected.is_empty(),
        };
        if !matches {
            debug!("CAS mismatch for instance {}", id);
            return Ok(false);
        }
        inner.put(id, new);
        Ok(true)
    }

    async fn ids(&self) -> RegistryResult<Vec<InstanceId>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<InstanceId> = inner.logs.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, id: &InstanceId, expected: &EventLog) -> RegistryResult<bool> {
        self.replace(id, expected, EventLog::new()).await
    }

    async fn find_by_name(&self, name: &str) -> RegistryResult<Vec<InstanceId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_name
            .get(name)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }
}
