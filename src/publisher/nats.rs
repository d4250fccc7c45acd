// Copyright (c) 2025 - Cowboy AI, Inc.
//! NATS core publisher for registry events

use async_trait::async_trait;

use crate::errors::RegistryResult;
use crate::events::InstanceEvent;
use crate::nats::NatsClient;
use crate::publisher::EventPublisher;
use crate::subjects::Subjects;

/// Publishes each event as JSON on `{prefix}.{instance_id}.{event_type}`
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: NatsClient,
    subjects: Subjects,
}

impl NatsEventPublisher {
    pub fn new(client: NatsClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            subjects: Subjects::new(prefix),
        }
    }

    pub fn subjects(&self) -> &Subjects {
        &self.subjects
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &InstanceEvent) -> RegistryResult<()> {
        self.client.publish(&self.subjects.event(event), event).await
    }
}
