//! # gravity-stitching
//!
//! GraphQL gateway core for Gravity.
//!
//! ## Features
//!
//! - **Schema stitching** - merge the local schema with Gravity's and resolve
//!   cross-schema fields by delegation
//! - **Mutation payloads** - tagged success/failure unions with normalized
//!   Gravity errors
//! - **Field builders** - money, dates, global ids and Relay connections
//! - **Resolver context** - per-request access token and loaders
//! - **HTTP handler** - axum endpoint with token extraction
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gravity_stitching::{Gateway, GatewayConfig, ResolverContext};
//!
//! # async fn example(gateway: Gateway) {
//! let context = ResolverContext::new(Some("token".to_string()));
//! let response = gateway.execute("{ me { name } }", context).await;
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod dates;
pub mod errors;
pub mod gateway;
pub mod identity;
pub mod loaders;
pub mod money;
pub mod pagination;
pub mod schema;
pub mod stitching;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{extract_access_token, extract_request_id, graphql_handler};
pub use config::{ConfigError, GatewayConfig};
pub use context::ResolverContext;
pub use errors::{format_gravity_error, GravityMutationError};
pub use gateway::Gateway;
pub use loaders::{Loader, LoaderError, LoaderFactory, LoaderName, LoaderRequest, LoaderResponse};
pub use pagination::{CursorCodec, PagingArgs};
pub use stitching::{Delegate, StitchedSchemaBuilder, SubSchema};

use thiserror::Error;

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Pagination error: {0}")]
    PaginationError(String),

    #[error("Invalid global id: {0}")]
    InvalidGlobalId(String),

    #[error("No {0} found in resolver context")]
    MissingLoader(LoaderName),

    #[error("Unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    #[error("Schema build error: {0}")]
    SchemaBuild(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Delegation of {field} failed: {message}")]
    Delegation { field: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
