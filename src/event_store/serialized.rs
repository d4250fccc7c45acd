// Copyright (c) 2025 - Cowboy AI, Inc.
//! Serialized In-Memory Event Log Store
//!
//! Emulates a distributed map: values exist only in serialized (JSON) form,
//! every read produces a freshly deserialized value, and the handle can be
//! cloned so several registries share one "cluster". Dropping a registry and
//! building a new one over a clone of the handle models a process restart.
//!
//! Two logs with the same content may serialize to different bytes (metadata
//! insertion order differs when the maps were filled differently), so the
//! compare-and-swap deserializes the stored value and compares it
//! structurally.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::InstanceId;
use crate::errors::{RegistryError, RegistryResult};
use crate::event_store::EventLogStore;
use crate::events::EventLog;

/// Shared map of serialized event logs
#[derive(Debug, Clone, Default)]
pub struct SerializedEventLogStore {
    entries: Arc<Mutex<HashMap<InstanceId, Vec<u8>>>>,
}

impl SerializedEventLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes for an instance, as a remote member would hold them
    pub async fn raw(&self, id: &InstanceId) -> Option<Vec<u8>> {
        self.entries.lock().await.get(id).cloned()
    }

    fn encode(log: &EventLog) -> RegistryResult<Vec<u8>> {
        Ok(serde_json::to_vec(log)?)
    }

    fn decode(bytes: &[u8]) -> RegistryResult<EventLog> {
        serde_json::from_slice(bytes).map_err(|e| RegistryError::Deserialization(e.to_string()))
    }
}

#[async_trait]
impl EventLogStore for SerializedEventLogStore {
    async fn get(&self, id: &InstanceId) -> RegistryResult<EventLog> {
        match self.entries.lock().await.get(id) {
            Some(bytes) => Self::decode(bytes),
            None => Ok(EventLog::new()),
        }
    }

    async fn compute_if_absent(&self, id: &InstanceId, default: EventLog) -> RegistryResult<EventLog> {
        let mut entries = self.entries.lock().await;
        if let Some(bytes) = entries.get(id) {
            return Self::decode(bytes);
        }
        // An empty log is the same as absence
        if default.is_empty() {
            return Ok(default);
        }
        entries.insert(id.clone(), Self::encode(&default)?);
        Ok(default)
    }

    async fn replace(&self, id: &InstanceId, expected: &EventLog, new: EventLog) -> RegistryResult<bool> {
        let mut entries = self.entries.lock().await;
        let current = match entries.get(id) {
            Some(bytes) => Self::decode(bytes)?,
            None => EventLog::new(),
        };
        if &current != expected {
            return Ok(false);
        }

        if new.is_empty() {
            entries.remove(id);
        } else {
            entries.insert(id.clone(), Self::encode(&new)?);
        }
        Ok(true)
    }

    async fn ids(&self) -> RegistryResult<Vec<InstanceId>> {
        let entries = self.entries.lock().await;
        let mut ids = Vec::with_capacity(entries.len());
        for (id, bytes) in entries.iter() {
            if !Self::decode(bytes)?.is_empty() {
                ids.push(id.clone());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn remove(&self, id: &InstanceId, expected: &EventLog) -> RegistryResult<bool> {
        self.replace(id, expected, EventLog::new()).await
    }
}
