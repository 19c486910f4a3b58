//! Delegation of a field to a root field of a sub-schema

use async_graphql::parser::types::OperationType;
use async_graphql::{dynamic, ObjectType, Request, Response, Schema, SubscriptionType, Value};
use async_trait::async_trait;
use std::sync::Arc;

use super::{Fields, SchemaTarget};
use crate::context::ResolverContext;
use crate::{GatewayError, Result};

/// An executable schema that delegated documents are sent to
#[async_trait]
pub trait SubSchema: Send + Sync {
    async fn execute(&self, query: String, context: Option<ResolverContext>) -> Response;
}

#[async_trait]
impl<Query, Mutation, Subscription> SubSchema for Schema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    async fn execute(&self, query: String, context: Option<ResolverContext>) -> Response {
        let mut request = Request::new(query);
        if let Some(context) = context {
            request = request.data(context);
        }
        Schema::execute(self, request).await
    }
}

#[async_trait]
impl SubSchema for dynamic::Schema {
    async fn execute(&self, query: String, context: Option<ResolverContext>) -> Response {
        let mut request = Request::new(query);
        if let Some(context) = context {
            request = request.data(context);
        }
        dynamic::Schema::execute(self, request).await
    }
}

/// One delegated root field, with its selection already printed
#[derive(Debug, Clone)]
pub struct DelegationRequest {
    pub target: SchemaTarget,
    pub operation: OperationType,
    pub field_name: String,
    pub args: Fields,
    /// `None` for leaf fields
    pub selection: Option<String>,
    pub context: Option<ResolverContext>,
}

impl DelegationRequest {
    pub fn query(target: SchemaTarget, field_name: impl Into<String>, args: Fields) -> Self {
        Self {
            target,
            operation: OperationType::Query,
            field_name: field_name.into(),
            args,
            selection: None,
            context: None,
        }
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    pub fn with_context(mut self, context: Option<ResolverContext>) -> Self {
        self.context = context;
        self
    }

    /// Document sent to the target schema, e.g.
    /// `query { partner(id: "p1") { __typename name } }`
    pub fn document(&self) -> String {
        let mut field = self.field_name.clone();
        if !self.args.is_empty() {
            let args: Vec<String> = self
                .args
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            field.push_str(&format!("({})", args.join(", ")));
        }
        if let Some(selection) = &self.selection {
            field.push(' ');
            field.push_str(selection);
        }
        format!("{} {{ {field} }}", self.operation)
    }
}

/// Resolves a delegated field to its value in the target schema's response
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn delegate(&self, request: DelegationRequest) -> Result<Value>;
}

/// Delegates to one of two in-process (or remote) sub-schemas
pub struct SchemaDelegator {
    local: Arc<dyn SubSchema>,
    gravity: Arc<dyn SubSchema>,
}

impl SchemaDelegator {
    pub fn new(local: Arc<dyn SubSchema>, gravity: Arc<dyn SubSchema>) -> Self {
        Self { local, gravity }
    }

    fn schema(&self, target: SchemaTarget) -> &Arc<dyn SubSchema> {
        match target {
            SchemaTarget::Local => &self.local,
            SchemaTarget::Gravity => &self.gravity,
        }
    }
}

#[async_trait]
impl Delegate for SchemaDelegator {
    async fn delegate(&self, request: DelegationRequest) -> Result<Value> {
        let document = request.document();
        tracing::debug!(
            target = %request.target,
            field = %request.field_name,
            %document,
            "delegating field"
        );

        let response = self
            .schema(request.target)
            .execute(document, request.context)
            .await;

        let value = match response.data {
            Value::Object(mut data) => data
                .shift_remove(request.field_name.as_str())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };

        if !response.errors.is_empty() {
            let message = response
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");

            if value == Value::Null {
                return Err(GatewayError::Delegation {
                    field: request.field_name,
                    message,
                });
            }
            tracing::warn!(
                target = %request.target,
                field = %request.field_name,
                errors = %message,
                "delegated field resolved with partial errors"
            );
        }

        Ok(value)
    }
}
