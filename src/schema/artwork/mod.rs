//! Artwork type and root fields

pub mod utilities;

use async_graphql::connection::Connection;
use async_graphql::{Context, Object, SimpleObject, ID};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::read_loader;
use crate::identity::global_id;
use crate::loaders::{LoaderName, LoaderRequest};
use crate::money::Money;
use crate::pagination::{connection_from_array, ConnectionSlice};
use crate::schema::{from_body, paging_args};
use utilities::{embed, is_embedded_video, is_hangable, parse_dimension, Dimensions};

/// An artwork record as returned by Gravity
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Artwork {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "_id")]
    pub internal_id: Option<String>,
    pub title: Option<String>,
    pub medium: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
    pub artwork_location: Option<String>,
    pub price_paid_cents: Option<f64>,
    pub price_paid_currency: Option<String>,
    pub attribution_class: Option<String>,
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub depth: Option<Value>,
    pub diameter: Option<Value>,
    pub metric: Option<String>,
    pub website: Option<String>,
}

impl Artwork {
    pub fn internal_id(&self) -> &str {
        self.internal_id.as_deref().unwrap_or(&self.id)
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: parse_dimension(self.width.as_ref()),
            height: parse_dimension(self.height.as_ref()),
            depth: parse_dimension(self.depth.as_ref()),
            diameter: parse_dimension(self.diameter.as_ref()),
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct AttributionClass {
    pub name: String,
}

impl AttributionClass {
    /// `"open edition"` becomes `"Open edition"`
    fn from_raw(raw: &str) -> Self {
        let mut chars = raw.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self { name }
    }
}

#[Object]
impl Artwork {
    /// A globally unique ID.
    async fn id(&self) -> ID {
        ID(global_id("Artwork", self.internal_id()))
    }

    /// A type-specific ID likely used as a database ID.
    #[graphql(name = "internalID")]
    async fn internal_id_field(&self) -> ID {
        ID(self.internal_id().to_string())
    }

    async fn slug(&self) -> &str {
        &self.id
    }

    async fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    async fn medium(&self) -> Option<&str> {
        self.medium.as_deref()
    }

    async fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    async fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    async fn artwork_location(&self) -> Option<&str> {
        self.artwork_location.as_deref()
    }

    async fn price_paid(&self) -> Option<Money> {
        self.price_paid_cents?;
        Some(Money::from_minor(
            self.price_paid_cents,
            self.price_paid_currency.as_deref(),
        ))
    }

    async fn attribution_class(&self) -> Option<AttributionClass> {
        self.attribution_class
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(AttributionClass::from_raw)
    }

    /// Two-dimensional and small enough to view on a wall
    async fn is_hangable(&self) -> bool {
        is_hangable(&self.dimensions(), self.metric.as_deref())
    }

    async fn embed(
        &self,
        #[graphql(default_with = "\"853\".to_string()")] width: String,
        #[graphql(default_with = "\"450\".to_string()")] height: String,
        #[graphql(default = false)] autoplay: bool,
    ) -> Option<String> {
        if !is_embedded_video(self.website.as_deref(), self.category.as_deref()) {
            return None;
        }
        embed(self.website.as_deref()?, &width, &height, autoplay)
    }
}

#[derive(Default)]
pub struct ArtworkQuery;

#[Object]
impl ArtworkQuery {
    /// An artwork by id
    async fn artwork(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<Artwork>> {
        let Some(loader) = read_loader(ctx, LoaderName::Artwork) else {
            return Ok(None);
        };
        let response = loader
            .load(LoaderRequest::by_id(id))
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?;
        Ok(Some(from_body(response.body)?))
    }

    /// Artworks by id. A list without any non-null id matches nothing.
    async fn artworks(
        &self,
        ctx: &Context<'_>,
        ids: Vec<Option<String>>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
    ) -> async_graphql::Result<Option<Connection<String, Artwork>>> {
        let args = paging_args(ctx, first, after, last, before)?;
        let ids: Vec<String> = ids.into_iter().flatten().collect();
        if ids.is_empty() {
            return Ok(Some(ConnectionSlice::empty().into_connection()));
        }

        let Some(loader) = read_loader(ctx, LoaderName::Artworks) else {
            return Ok(None);
        };
        let response = loader
            .load(LoaderRequest::new(json!({ "ids": ids })))
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?;
        let artworks: Vec<Artwork> = from_body(response.body)?;

        Ok(Some(connection_from_array(artworks, &args)?.into_connection()))
    }
}
