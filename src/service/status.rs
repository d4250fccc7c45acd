// Copyright (c) 2025 - Cowboy AI, Inc.
//! Status Probing
//!
//! Health checks feed `report_status` like any other caller:
//!
//! ```text
//! Registered / RegistrationUpdated ──┐
//!                                    ├→ StatusUpdater → HealthProbe → report_status
//! interval tick (all instances) ─────┘
//! ```
//!
//! [`StatusUpdateTrigger`] listens on a [`BroadcastEventPublisher`] receiver
//! and on an optional interval, and drives a [`StatusUpdater`].
//!
//! [`BroadcastEventPublisher`]: crate::publisher::BroadcastEventPublisher

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{InstanceId, InstanceStatus, Registration};
use crate::errors::{RegistryError, RegistryResult};
use crate::events::InstanceEvent;
use crate::service::registry::InstanceRegistry;

/// Determines the health of one instance
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, registration: &Registration) -> InstanceStatus;
}

/// Probes an instance and records the result in the registry
#[derive(Clone)]
pub struct StatusUpdater {
    registry: InstanceRegistry,
    probe: Arc<dyn HealthProbe>,
}

impl StatusUpdater {
    pub fn new(registry: InstanceRegistry, probe: Arc<dyn HealthProbe>) -> Self {
        Self { registry, probe }
    }

    /// Probe one instance
    ///
    /// Unknown and deregistered instances are skipped. An instance
    /// deregistered while the probe was in flight is skipped as well.
    pub async fn update_status(&self, id: &InstanceId) -> RegistryResult<Option<InstanceEvent>> {
        let Some(instance) = self.registry.get_instance(id).await? else {
            debug!(instance_id = %id, "Skipping status check for unknown instance");
            return Ok(None);
        };
        let Some(registration) = instance.registration.as_ref().filter(|_| instance.is_registered())
        else {
            debug!(instance_id = %id, "Skipping status check for deregistered instance");
            return Ok(None);
        };

        let status = self.probe.probe(registration).await;
        debug!(instance_id = %id, %status, "Probed instance");

        match self.registry.report_status(id, status).await {
            Err(RegistryError::InvalidStateTransition { .. }) => {
                debug!(instance_id = %id, "Instance deregistered during status check");
                Ok(None)
            }
            other => other,
        }
    }

    /// Probe every registered instance, logging failures per instance
    pub async fn update_all(&self) -> RegistryResult<usize> {
        let mut changed = 0;
        for instance in self.registry.find_all().await? {
            if !instance.is_registered() {
                continue;
            }
            match self.update_status(&instance.id).await {
                Ok(Some(_)) => changed += 1,
                Ok(None) => {}
                Err(e) => warn!(instance_id = %instance.id, error = %e, "Status update failed"),
            }
        }
        Ok(changed)
    }
}

/// Runs status checks on registration events and on a fixed interval
pub struct StatusUpdateTrigger {
    updater: StatusUpdater,
    interval: Option<Duration>,
}

impl StatusUpdateTrigger {
    pub fn new(updater: StatusUpdater) -> Self {
        Self {
            updater,
            interval: None,
        }
    }

    /// Also re-check every registered instance each `period`
    pub fn with_interval(mut self, period: Duration) -> Self {
        self.interval = Some(period).filter(|p| !p.is_zero());
        self
    }

    /// Run on a background task until the event channel closes
    ///
    /// Without an event channel only the interval drives checks.
    pub fn spawn(self, events: impl Into<Option<broadcast::Receiver<InstanceEvent>>>) -> JoinHandle<()> {
        tokio::spawn(self.run(events.into()))
    }

    pub async fn run(self, mut events: Option<broadcast::Receiver<InstanceEvent>>) {
        if events.is_none() && self.interval.is_none() {
            warn!("Status update trigger has neither events nor an interval");
            return;
        }

        let mut ticker = self.interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        info!(interval = ?self.interval, "Status update trigger started");

        loop {
            tokio::select! {
                received = recv(events.as_mut()) => match received {
                    Ok(event) => self.on_event(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Status trigger lagged behind, running full check");
                        self.check_all().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tick(ticker.as_mut()) => self.check_all().await,
            }
        }

        info!("Status update trigger stopped");
    }

    async fn on_event(&self, event: &InstanceEvent) {
        match event {
            InstanceEvent::Registered(_) | InstanceEvent::RegistrationUpdated(_) => {
                if let Err(e) = self.updater.update_status(event.instance_id()).await {
                    warn!(instance_id = %event.instance_id(), error = %e, "Status update failed");
                }
            }
            InstanceEvent::StatusChanged(_) | InstanceEvent::Deregistered(_) => {}
        }
    }

    async fn check_all(&self) {
        if let Err(e) = self.updater.update_all().await {
            warn!(error = %e, "Periodic status check failed");
        }
    }
}

async fn recv(events: Option<&mut broadcast::Receiver<InstanceEvent>>) -> Result<InstanceEvent, RecvError> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(feature = "http-probe")]
pub use http::HttpHealthProbe;

#[cfg(feature = "http-probe")]
mod http {
    use super::*;
    use reqwest::Client;

    /// Probes the registration's health URL over HTTP
    ///
    /// A JSON body with a `status` field decides the result when present.
    /// Otherwise any 2xx is UP and everything else (503 included) DOWN.
    /// Requests that never get a response report OFFLINE.
    #[derive(Debug, Clone)]
    pub struct HttpHealthProbe {
        client: Client,
    }

    impl HttpHealthProbe {
        pub fn new(timeout: Duration) -> RegistryResult<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| RegistryError::Configuration(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HealthProbe for HttpHealthProbe {
        async fn probe(&self, registration: &Registration) -> InstanceStatus {
            let response = match self.client.get(registration.health_url()).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!(url = registration.health_url(), error = %e, "Health check unreachable");
                    return InstanceStatus::Offline;
                }
            };

            let code = response.status();
            let reported = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("status")?.as_str()?.parse::<InstanceStatus>().ok());

            match reported {
                Some(status) => status,
                None if code.is_success() => InstanceStatus::Up,
                None => InstanceStatus::Down,
            }
        }
    }
}
