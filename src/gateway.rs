//! The assembled gateway: the stitched schema plus per-request context
//! construction

use async_graphql::{dynamic, Request, Response};
use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig, GRAVITY_GRAPHQL_URL, GRAVITY_SCHEMA_PATH};
use crate::context::ResolverContext;
use crate::loaders::LoaderFactory;
use crate::schema::build_local_schema;
use crate::stitching::{
    gravity_extensions, RemoteSchema, StitchedSchemaBuilder, SubSchema, EXTENSION_SCHEMA,
};
use crate::{GatewayError, Result};

pub struct Gateway {
    schema: dynamic::Schema,
    loaders: Option<Arc<dyn LoaderFactory>>,
}

impl Gateway {
    pub fn new(schema: dynamic::Schema) -> Self {
        Self {
            schema,
            loaders: None,
        }
    }

    /// Gateway over Gravity's endpoint, with Gravity's SDL read from disk
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;
        let url = config
            .gravity_graphql_url
            .clone()
            .ok_or(ConfigError::Missing {
                name: GRAVITY_GRAPHQL_URL,
            })?;
        let path = config
            .gravity_schema_path
            .as_ref()
            .ok_or(ConfigError::Missing {
                name: GRAVITY_SCHEMA_PATH,
            })?;
        let gravity_sdl = std::fs::read_to_string(path).map_err(|source| GatewayError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let remote = RemoteSchema::new(url);
        tracing::info!(gravity = %remote.url(), schema = %path.display(), "building gateway schema");
        let schema = Self::stitch(config, Arc::new(remote), gravity_sdl).build()?;
        Ok(Self::new(schema))
    }

    /// Stitching builder preloaded with the local schema, `gravity` and the
    /// Gravity extensions
    pub fn stitch(
        config: &GatewayConfig,
        gravity: Arc<dyn SubSchema>,
        gravity_sdl: impl Into<String>,
    ) -> StitchedSchemaBuilder {
        let local = build_local_schema(config);
        let local_sdl = local.sdl();
        StitchedSchemaBuilder::new()
            .local(Arc::new(local), local_sdl)
            .gravity(gravity, gravity_sdl)
            .extensions(EXTENSION_SCHEMA, gravity_extensions())
            .allow_introspection(config.allow_introspection)
    }

    /// Mint request loaders with `factory`
    pub fn with_loaders(mut self, factory: Arc<dyn LoaderFactory>) -> Self {
        self.loaders = Some(factory);
        self
    }

    pub fn schema(&self) -> &dynamic::Schema {
        &self.schema
    }

    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    /// Resolver context for one request
    pub fn context_for(&self, access_token: Option<String>, request_id: Option<String>) -> ResolverContext {
        let context = match &self.loaders {
            Some(factory) => ResolverContext::from_factory(factory.as_ref(), access_token),
            None => ResolverContext::new(access_token),
        };
        match request_id {
            Some(request_id) => context.with_request_id(request_id),
            None => context,
        }
    }

    pub async fn execute(&self, request: impl Into<Request>, context: ResolverContext) -> Response {
        self.schema.execute(request.into().data(context)).await
    }
}
