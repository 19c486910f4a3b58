//! Gateway configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const GRAVITY_GRAPHQL_URL: &str = "GRAVITY_GRAPHQL_URL";
pub const GRAVITY_SCHEMA_PATH: &str = "GRAVITY_SCHEMA_PATH";
pub const DEFAULT_PAGE_SIZE: &str = "GATEWAY_DEFAULT_PAGE_SIZE";
pub const MAX_PAGE_SIZE: &str = "GATEWAY_MAX_PAGE_SIZE";
pub const ALLOW_INTROSPECTION: &str = "GATEWAY_ALLOW_INTROSPECTION";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {message}")]
    InvalidUrl { name: &'static str, message: String },

    #[error("{name} must be {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("default page size ({default}) cannot exceed max page size ({max})")]
    PageSizeBounds { default: i32, max: i32 },

    #[error("{name} is required")]
    Missing { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gravity's GraphQL endpoint; delegated queries go here when set
    pub gravity_graphql_url: Option<Url>,

    /// Gravity SDL on disk, used to build the gateway schema
    pub gravity_schema_path: Option<PathBuf>,

    /// Page size when a connection is requested without `first`/`last`
    pub default_page_size: i32,

    /// Upper bound for `first`/`last`
    pub max_page_size: i32,

    pub allow_introspection: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gravity_graphql_url: None,
            gravity_schema_path: None,
            default_page_size: 20,
            max_page_size: 100,
            allow_introspection: true,
        }
    }
}

impl GatewayConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; absent keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(GRAVITY_GRAPHQL_URL) {
            let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
                name: GRAVITY_GRAPHQL_URL,
                message: e.to_string(),
            })?;
            config.gravity_graphql_url = Some(url);
        }
        if let Some(raw) = lookup(GRAVITY_SCHEMA_PATH) {
            config.gravity_schema_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup(DEFAULT_PAGE_SIZE) {
            config.default_page_size = page_size(DEFAULT_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(MAX_PAGE_SIZE) {
            config.max_page_size = page_size(MAX_PAGE_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ALLOW_INTROSPECTION) {
            config.allow_introspection = flag(ALLOW_INTROSPECTION, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::PageSizeBounds {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }
}

fn page_size(name: &'static str, raw: &str) -> Result<i32, ConfigError> {
    match raw.trim().parse::<i32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidValue {
            name,
            expected: "a positive integer",
            value: raw.to_string(),
        }),
    }
}

fn flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            expected: "a boolean",
            value: raw.to_string(),
        }),
    }
}
