//! Platform abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream platform
//! - Pre-compute the pieces every attempt needs (base URL, Host, credential)
//! - Own the platform's health record

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::validation::{DEFAULT_KEY_HEADER, DEFAULT_KEY_PREFIX};
use crate::config::PlatformConfig;
use crate::health::PlatformHealth;

/// Error building a platform from its configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("platform `{name}`: invalid base url: {source}")]
    BaseUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },

    #[error("platform `{name}`: base url has no host")]
    MissingHost { name: String },

    #[error("platform `{name}`: invalid key header `{header}`")]
    KeyHeader { name: String, header: String },

    #[error("platform `{name}`: credential is not a valid header value")]
    Credential { name: String },
}

/// A single upstream platform with its runtime state.
#[derive(Debug)]
pub struct Platform {
    /// Stable identity, the platform's position in configuration order.
    id: usize,
    config: PlatformConfig,
    base_url: Url,
    host: HeaderValue,
    key_header: HeaderName,
    credential: Option<HeaderValue>,
    health: PlatformHealth,
}

impl Platform {
    pub fn new(id: usize, config: PlatformConfig) -> Result<Self, BuildError> {
        let base_url = Url::parse(config.base_url.trim()).map_err(|source| BuildError::BaseUrl {
            name: config.name.clone(),
            source,
        })?;

        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(BuildError::MissingHost {
                    name: config.name.clone(),
                })
            }
        };
        let host = HeaderValue::from_str(&host).map_err(|_| BuildError::MissingHost {
            name: config.name.clone(),
        })?;

        let header = config.key_header.as_deref().unwrap_or(DEFAULT_KEY_HEADER);
        let key_header =
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| BuildError::KeyHeader {
                name: config.name.clone(),
                header: header.to_string(),
            })?;

        let credential = if config.api_key.is_empty() {
            None
        } else {
            let prefix = config.key_prefix.as_deref().unwrap_or(DEFAULT_KEY_PREFIX);
            let mut value = HeaderValue::from_str(&format!("{}{}", prefix, config.api_key))
                .map_err(|_| BuildError::Credential {
                    name: config.name.clone(),
                })?;
            value.set_sensitive(true);
            Some(value)
        };

        Ok(Self {
            id,
            config,
            base_url,
            host,
            key_header,
            credential,
            health: PlatformHealth::new(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn group(&self) -> &str {
        &self.config.group
    }

    /// Weight coerced to at least 1.
    pub fn weight(&self) -> u32 {
        self.config.weight.max(1)
    }

    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Value sent as `Host` to this platform.
    pub fn host(&self) -> &HeaderValue {
        &self.host
    }

    /// Header the credential occupies; always stripped from forwarded requests.
    pub fn key_header(&self) -> &HeaderName {
        &self.key_header
    }

    /// `prefix + api_key`, when a key is configured.
    pub fn credential(&self) -> Option<&HeaderValue> {
        self.credential.as_ref()
    }

    pub fn health(&self) -> &PlatformHealth {
        &self.health
    }
}
