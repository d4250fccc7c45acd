// Copyright (c) 2025 - Cowboy AI, Inc.

//! Registry configuration
//!
//! Everything tunable is gathered in [`RegistryConfig`], built either from
//! `Default` (in-memory backend, sensible retry bounds) or from environment
//! variables at process start:
//!
//! | Variable                          | Field                          |
//! |-----------------------------------|--------------------------------|
//! | `REGISTRY_BACKEND`                | `backend` (memory, serialized, nats-kv) |
//! | `REGISTRY_MAX_ATTEMPTS`           | `retry.max_attempts`           |
//! | `REGISTRY_INITIAL_BACKOFF_MS`     | `retry.initial_backoff`        |
//! | `REGISTRY_MAX_BACKOFF_MS`         | `retry.max_backoff`            |
//! | `REGISTRY_REGISTRATION_POLICY`    | `registration_policy`          |
//! | `NATS_URL`                        | `nats.servers`                 |
//! | `REGISTRY_KV_BUCKET`              | `kv.bucket`                    |
//! | `REGISTRY_KV_STORAGE`             | `kv.storage` (file, memory)    |
//! | `REGISTRY_SUBJECT_PREFIX`         | `subject_prefix`               |
//! | `REGISTRY_STATUS_INTERVAL_SECS`   | `status_check_interval`        |
//! | `REGISTRY_EVICT_AFTER_SECS`       | `evict_deregistered_after`     |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::aggregate::RegistrationPolicy;
use crate::errors::{RegistryError, RegistryResult};
use crate::nats::NatsConfig;

/// Default subject prefix for published registry events
pub const DEFAULT_SUBJECT_PREFIX: &str = "registry.instances";

/// Which event log store backs the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Hash map with a by-name index, process-local
    #[default]
    Memory,
    /// Serialized map emulating a distributed cache
    Serialized,
    /// NATS JetStream key-value bucket
    NatsKv,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Serialized => write!(f, "serialized"),
            StoreBackend::NatsKv => write!(f, "nats-kv"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "serialized" => Ok(StoreBackend::Serialized),
            "nats-kv" | "nats_kv" | "nats" => Ok(StoreBackend::NatsKv),
            other => Err(RegistryError::Configuration(format!(
                "unknown store backend: {}",
                other
            ))),
        }
    }
}

/// Storage type for the JetStream bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageType {
    /// File-based storage (persistent across restarts)
    #[default]
    File,
    /// Memory-based storage (faster, but lost on restart)
    Memory,
}

impl FromStr for StorageType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageType::File),
            "memory" => Ok(StorageType::Memory),
            other => Err(RegistryError::Configuration(format!(
                "unknown KV storage type: {}",
                other
            ))),
        }
    }
}

impl From<StorageType> for async_nats::jetstream::stream::StorageType {
    fn from(storage: StorageType) -> Self {
        match storage {
            StorageType::File => async_nats::jetstream::stream::StorageType::File,
            StorageType::Memory => async_nats::jetstream::stream::StorageType::Memory,
        }
    }
}

/// Bounded retry with exponential backoff for the CAS loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total CAS attempts before giving up (at least 1)
    pub max_attempts: u32,
    /// Sleep before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound on any single sleep
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts (tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Sleep after the given failed attempt (1-based), doubling each time
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// JetStream KV bucket settings
#[derive(Debug, Clone)]
pub struct KvStoreConfig {
    /// Bucket name
    pub bucket: String,
    /// Revisions kept per key
    pub history: i64,
    /// File or memory storage
    pub storage: StorageType,
    /// Number of replicas (for clustered NATS)
    pub replicas: usize,
}

impl Default for KvStoreConfig {
    fn default() -> Self {
        Self {
            bucket: "INSTANCE_REGISTRY".to_string(),
            history: 1,
            storage: StorageType::File,
            replicas: 1,
        }
    }
}

/// Complete registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub backend: StoreBackend,
    pub retry: RetryPolicy,
    pub registration_policy: RegistrationPolicy,
    pub nats: NatsConfig,
    pub kv: KvStoreConfig,
    /// Prefix for `<prefix>.<instance_id>.<event_type>` subjects
    pub subject_prefix: String,
    /// Period of the background status re-check; `None` disables it
    pub status_check_interval: Option<Duration>,
    /// Evict deregistered instances after this long; `None` keeps everything
    pub evict_deregistered_after: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            retry: RetryPolicy::default(),
            registration_policy: RegistrationPolicy::default(),
            nats: NatsConfig::default(),
            kv: KvStoreConfig::default(),
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            status_check_interval: None,
            evict_deregistered_after: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their default; set but unparsable ones are a
    /// `Configuration` error.
    pub fn from_env() -> RegistryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> RegistryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("REGISTRY_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(attempts) = parse::<u32>(&lookup, "REGISTRY_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(RegistryError::Configuration(
                    "REGISTRY_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse::<u64>(&lookup, "REGISTRY_INITIAL_BACKOFF_MS")? {
            config.retry.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "REGISTRY_MAX_BACKOFF_MS")? {
            config.retry.max_backoff = Duration::from_millis(ms);
        }
        if let Some(policy) = lookup("REGISTRY_REGISTRATION_POLICY") {
            config.registration_policy = policy.parse().map_err(RegistryError::Configuration)?;
        }
        if let Some(url) = lookup("NATS_URL") {
            config.nats = NatsConfig::with_servers(&url);
        }
        if let Some(bucket) = lookup("REGISTRY_KV_BUCKET") {
            config.kv.bucket = bucket;
        }
        if let Some(storage) = lookup("REGISTRY_KV_STORAGE") {
            config.kv.storage = storage.parse()?;
        }
        if let Some(prefix) = lookup("REGISTRY_SUBJECT_PREFIX") {
            config.subject_prefix = prefix;
        }
        if let Some(secs) = parse::<u64>(&lookup, "REGISTRY_STATUS_INTERVAL_SECS")? {
            config.status_check_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = parse::<u64>(&lookup, "REGISTRY_EVICT_AFTER_SECS")? {
            config.evict_deregistered_after = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> RegistryResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RegistryError::Configuration(format!("{}={:?}: {}", key, raw, e))),
    }
}
