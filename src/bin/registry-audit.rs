// Copyright (c) 2025 - Cowboy AI, Inc.
//! Registry Audit Tool
//!
//! Replays every stored instance log, checks that versions run 0, 1, 2, …
//! without gaps, and prints the folded state of each instance.
//!
//! Run with: cargo run --bin registry-audit
//!
//! Configuration comes from the usual `REGISTRY_*` and `NATS_URL`
//! environment variables. Set `REGISTRY_AUDIT_EVICT=1` to also apply the
//! retention policy (`REGISTRY_EVICT_AFTER_SECS`) after the audit.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use cim_instance_registry::aggregate::InstanceAggregate;
use cim_instance_registry::{InstanceRegistry, RegistryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = RegistryConfig::from_env().context("Invalid registry configuration")?;
    info!("Configuration loaded:");
    info!("  - Backend: {}", config.backend);
    info!("  - NATS: {:?}", config.nats.servers);
    info!("  - KV bucket: {}", config.kv.bucket);

    let registry = InstanceRegistry::from_config(&config)
        .await
        .context("Failed to open event log store")?;

    let ids = registry
        .store()
        .ids()
        .await
        .context("Failed to list instances")?;
    info!("Auditing {} instance logs", ids.len());

    let mut broken = 0usize;
    for id in &ids {
        let log = registry
            .event_log(id)
            .await
            .with_context(|| format!("Failed to read log of {}", id))?;

        if let Err(gap) = log.verify_versions() {
            broken += 1;
            error!("Instance {}: {}", id, gap);
            continue;
        }

        let instance = InstanceAggregate::from_events(id.clone(), &log);
        println!(
            "{}\t{}\t{:?}\t{}\tv{}",
            instance.id,
            instance.name().unwrap_or("-"),
            instance.lifecycle,
            instance.status,
            instance.version
        );
    }

    if std::env::var("REGISTRY_AUDIT_EVICT").is_ok_and(|v| v == "1") {
        if config.evict_deregistered_after.is_none() {
            warn!("REGISTRY_AUDIT_EVICT set but no REGISTRY_EVICT_AFTER_SECS; nothing to evict");
        } else {
            let evicted = registry.evict(Utc::now()).await.context("Eviction failed")?;
            info!("Evicted {} instance logs", evicted.len());
        }
    }

    if broken > 0 {
        anyhow::bail!("{} of {} logs have version gaps", broken, ids.len());
    }
    info!("Audit complete: {} logs verified", ids.len());
    Ok(())
}
