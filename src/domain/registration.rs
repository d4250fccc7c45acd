// Copyright (c) 2025 - Cowboy AI, Inc.
//! Registration Value Object
//!
//! A registration is what an instance submits about itself: its name, the
//! URLs the registry uses to reach it, and free-form metadata.
//!
//! # Equality
//!
//! Metadata keeps insertion order for display, but two registrations are
//! equal when they hold the same key/value pairs regardless of the order
//! or API used to fill them. `IndexMap`'s `PartialEq` compares as a map, so
//! the derived equality below is structural. Event log compare-and-swap
//! depends on this.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered metadata; equality ignores order
pub type Metadata = IndexMap<String, String>;

/// Registration validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Registration name is empty")]
    EmptyName,

    #[error("Health URL is empty")]
    EmptyHealthUrl,

    #[error("{field} is not an absolute URL: {value}")]
    NotAbsolute { field: &'static str, value: String },
}

/// Immutable registration of a service instance
///
/// # Examples
///
/// ```rust
/// use cim_instance_registry::domain::Registration;
///
/// let registration = Registration::create("billing", "http://billing:8080/health")
///     .management_url("http://billing:8080")
///     .metadata("zone", "eu-1")
///     .build()
///     .unwrap();
///
/// assert_eq!(registration.name(), "billing");
/// assert!(Registration::create("", "http://x/health").build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    name: String,
    health_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    management_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

impl Registration {
    /// Start building a registration
    pub fn create(name: impl Into<String>, health_url: impl Into<String>) -> RegistrationBuilder {
        RegistrationBuilder {
            name: name.into(),
            health_url: health_url.into(),
            management_url: None,
            service_url: None,
            source: None,
            metadata: Metadata::new(),
        }
    }

    /// Copy this registration into a builder for modification
    pub fn to_builder(&self) -> RegistrationBuilder {
        RegistrationBuilder {
            name: self.name.clone(),
            health_url: self.health_url.clone(),
            management_url: self.management_url.clone(),
            service_url: self.service_url.clone(),
            source: self.source.clone(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    pub fn management_url(&self) -> Option<&str> {
        self.management_url.as_deref()
    }

    pub fn service_url(&self) -> Option<&str> {
        self.service_url.as_deref()
    }

    /// Where the registration came from (e.g. `http-api`, `discovery`)
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Builder for [`Registration`]
#[derive(Debug, Clone)]
pub struct RegistrationBuilder {
    name: String,
    health_url: String,
    management_url: Option<String>,
    service_url: Option<String>,
    source: Option<String>,
    metadata: Metadata,
}

impl RegistrationBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = url.into();
        self
    }

    pub fn management_url(mut self, url: impl Into<String>) -> Self {
        self.management_url = Some(url.into());
        self
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add or overwrite a single metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add every entry of an existing map
    pub fn metadata_all<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Validate and build the registration
    ///
    /// # Invariants
    /// - Name is non-empty
    /// - Health URL is non-empty and absolute
    /// - Management and service URLs, when present, are absolute
    pub fn build(self) -> Result<Registration, RegistrationError> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.health_url.trim().is_empty() {
            return Err(RegistrationError::EmptyHealthUrl);
        }

        check_absolute("health_url", &self.health_url)?;
        if let Some(url) = &self.management_url {
            check_absolute("management_url", url)?;
        }
        if let Some(url) = &self.service_url {
            check_absolute("service_url", url)?;
        }

        Ok(Registration {
            name: self.name,
            health_url: self.health_url,
            management_url: self.management_url,
            service_url: self.service_url,
            source: self.source,
            metadata: self.metadata,
        })
    }
}

/// `scheme://rest` with an alphabetic-led scheme and a non-empty rest
fn check_absolute(field: &'static str, value: &str) -> Result<(), RegistrationError> {
    let absolute = match value.split_once("://") {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    };

    if absolute {
        Ok(())
    } else {
        Err(RegistrationError::NotAbsolute {
            field,
            value: value.to_string(),
        })
    }
}
