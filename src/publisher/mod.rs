// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Publishing
//!
//! After an event is durably appended, the registry hands it to an
//! [`EventPublisher`]. Publishing is fire-and-forget: the registry logs a
//! failed publish and moves on, the stored log stays authoritative.
//!
//! # Implementations
//!
//! - [`BroadcastEventPublisher`]: tokio broadcast channel for in-process
//!   subscribers (status trigger, tests)
//! - [`NatsEventPublisher`]: JSON on `{prefix}.{instance_id}.{event_type}`
//! - [`NoopEventPublisher`]: drops everything

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::RegistryResult;
use crate::events::InstanceEvent;

pub mod nats;

pub use nats::NatsEventPublisher;

/// Default capacity of the broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Sink for newly appended events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Push one event to interested parties
    async fn publish(&self, event: &InstanceEvent) -> RegistryResult<()>;

    /// In-process feed of published events, when the publisher has one
    fn local_events(&self) -> Option<broadcast::Receiver<InstanceEvent>> {
        None
    }
}

/// In-process fan-out over a tokio broadcast channel
///
/// Receivers that fall behind by more than the channel capacity observe
/// `RecvError::Lagged` and skip ahead.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<InstanceEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<InstanceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &InstanceEvent) -> RegistryResult<()> {
        // No receivers is not a failure: nobody is listening yet
        if self.sender.send(event.clone()).is_err() {
            debug!(
                instance_id = %event.instance_id(),
                event_type = event.event_type_name(),
                "No subscribers for event"
            );
        }
        Ok(())
    }

    fn local_events(&self) -> Option<broadcast::Receiver<InstanceEvent>> {
        Some(self.subscribe())
    }
}

/// Publisher that discards events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: &InstanceEvent) -> RegistryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstanceId, InstanceStatus};
    use chrono::Utc;

    fn event() -> InstanceEvent {
        InstanceEvent::status_changed(InstanceId::new("abc"), 1, Utc::now(), InstanceStatus::Up)
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_every_subscriber() {
        let publisher = BroadcastEventPublisher::default();
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();
        let event = event();

        publisher.publish(&event).await.unwrap();

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastEventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        assert!(publisher.publish(&event()).await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_accepts_everything() {
        assert!(NoopEventPublisher.publish(&event()).await.is_ok());
    }
}
