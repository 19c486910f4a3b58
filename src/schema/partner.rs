//! Partners and their shows

use async_graphql::{Context, Object, ID};
use serde::Deserialize;

use crate::context::read_loader;
use crate::dates::format_date;
use crate::identity::global_id;
use crate::loaders::{LoaderName, LoaderRequest};
use crate::schema::from_body;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Partner {
    pub id: String,
    #[serde(rename = "_id")]
    pub internal_id: Option<String>,
    pub name: Option<String>,
}

impl Partner {
    pub fn internal_id(&self) -> &str {
        self.internal_id.as_deref().unwrap_or(&self.id)
    }
}

#[Object]
impl Partner {
    /// A globally unique ID.
    async fn id(&self) -> ID {
        ID(global_id("Partner", self.internal_id()))
    }

    /// A type-specific ID likely used as a database ID.
    #[graphql(name = "internalID")]
    async fn internal_id_field(&self) -> ID {
        ID(self.internal_id().to_string())
    }

    async fn slug(&self) -> &str {
        &self.id
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A partner show
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Show {
    pub id: String,
    #[serde(rename = "_id")]
    pub internal_id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
}

#[Object]
impl Show {
    async fn id(&self) -> ID {
        ID(global_id("Show", self.internal_id.as_deref().unwrap_or(&self.id)))
    }

    #[graphql(name = "internalID")]
    async fn internal_id_field(&self) -> ID {
        ID(self.internal_id.clone().unwrap_or_else(|| self.id.clone()))
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    async fn start_at(&self, format: Option<String>) -> Option<String> {
        format_date(self.start_at.as_deref(), format.as_deref())
    }

    async fn end_at(&self, format: Option<String>) -> Option<String> {
        format_date(self.end_at.as_deref(), format.as_deref())
    }
}

#[derive(Default)]
pub struct PartnerQuery;

#[Object]
impl PartnerQuery {
    /// A partner by id
    async fn partner(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<Partner>> {
        let Some(loader) = read_loader(ctx, LoaderName::Partner) else {
            return Ok(None);
        };
        let response = loader
            .load(LoaderRequest::by_id(id))
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?;
        Ok(Some(from_body(response.body)?))
    }
}
