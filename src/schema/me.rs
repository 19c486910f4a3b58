//! The current user and profile updates

use async_graphql::connection::Connection;
use async_graphql::{Context, InputObject, Object, SimpleObject, Union, ID};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::{read_loader, require_loader, ResolverContext};
use crate::dates::format_date;
use crate::errors::{mutation_error, GravityMutationError};
use crate::identity::global_id;
use crate::loaders::{LoaderName, LoaderRequest};
use crate::pagination::{connection_from_array_slice, PagingArgs, SliceInfo};
use crate::schema::partner::Show;
use crate::schema::{from_body, page_sizes};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Me {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub paddle_number: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowedShow {
    partner_show: Show,
}

#[Object]
impl Me {
    /// A globally unique ID.
    async fn id(&self) -> ID {
        ID(global_id("Me", &self.id))
    }

    /// A type-specific ID likely used as a database ID.
    #[graphql(name = "internalID")]
    async fn internal_id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    async fn paddle_number(&self) -> Option<&str> {
        self.paddle_number.as_deref()
    }

    async fn created_at(&self, format: Option<String>) -> Option<String> {
        format_date(self.created_at.as_deref(), format.as_deref())
    }

    /// A list of the current user's currently followed shows
    async fn followed_shows(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> async_graphql::Result<Option<Connection<String, Show>>> {
        let Some(loader) = read_loader(ctx, LoaderName::FollowedShows) else {
            return Ok(None);
        };

        let (default_page_size, max_page_size) = page_sizes(ctx);
        let args = PagingArgs::new(first, after, last, before);
        let params = args.paging_parameters(default_page_size, max_page_size)?;

        let response = loader
            .load(LoaderRequest::new(json!({
                "size": params.limit,
                "offset": params.offset,
                "total_count": true,
            })))
            .await
            .map_err(|e| async_graphql::Error::new(e.message))?;

        let total_count = response.total_count();
        let follows: Vec<FollowedShow> = from_body(response.body)?;
        let shows: Vec<Show> = follows.into_iter().map(|f| f.partner_show).collect();
        let info = SliceInfo {
            slice_start: params.offset,
            array_length: total_count.unwrap_or(params.offset + shows.len()),
        };

        Ok(Some(
            connection_from_array_slice(shows, &args, info)?.into_connection(),
        ))
    }
}

/// The current user, or `None` without credentials or when Gravity fails
async fn load_me(ctx: &Context<'_>) -> Option<Me> {
    let context = ctx.data_opt::<ResolverContext>()?;
    if !context.is_authenticated() {
        return None;
    }
    let loader = context.loader(LoaderName::Me)?;

    match loader.load(LoaderRequest::default()).await {
        Ok(response) => match from_body(response.body) {
            Ok(me) => Some(me),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable me response");
                None
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "me unavailable");
            None
        }
    }
}

#[derive(Default)]
pub struct MeQuery;

#[Object]
impl MeQuery {
    async fn me(&self, ctx: &Context<'_>) -> Option<Me> {
        load_me(ctx).await
    }
}

#[derive(InputObject, Serialize, Debug, Clone, Default)]
pub struct EditableLocation {
    /// First line of an address
    pub address: Option<String>,
    /// Second line of an address
    #[serde(rename = "address_2")]
    pub address2: Option<String>,
    /// The city the location is based in
    pub city: Option<String>,
    /// The county the location is based in
    pub country: Option<String>,
    /// An optional display string for the location
    pub summary: Option<String>,
    /// Postal code for a string
    pub postal_code: Option<String>,
    /// The (optional) name of the state for location
    pub state: Option<String>,
    /// The (optional) state code of the state for location
    pub state_code: Option<String>,
}

#[derive(InputObject, Serialize, Debug, Clone, Default)]
pub struct UpdateMyProfileInput {
    #[serde(skip)]
    pub client_mutation_id: Option<String>,
    /// The given name of the user.
    pub name: Option<String>,
    /// The given email of the user.
    pub email: Option<String>,
    /// The given phone number of the user.
    pub phone: Option<String>,
    /// The given location of the user as structured data
    pub location: Option<EditableLocation>,
    /// The collector level for the user
    pub collector_level: Option<i32>,
    /// The minimum price collector has selected
    pub price_range_min: Option<i32>,
    /// The maximum price collector has selected
    pub price_range_max: Option<f64>,
    pub receive_purchase_notification: Option<bool>,
    pub receive_outbid_notification: Option<bool>,
    pub receive_lot_opening_soon_notification: Option<bool>,
    pub receive_sale_opening_closing_notification: Option<bool>,
    pub receive_new_works_notification: Option<bool>,
    pub receive_new_sales_notification: Option<bool>,
    pub receive_promotion_notification: Option<bool>,
}

impl UpdateMyProfileInput {
    /// Snake-cased upstream payload without the keys that were not given
    pub fn to_params(&self) -> serde_json::Result<Value> {
        Ok(without_nulls(serde_json::to_value(self)?))
    }
}

fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, without_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub collector_level: Option<i32>,
    pub price_range_min: Option<i32>,
    pub price_range_max: Option<f64>,
}

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(global_id("User", &self.id))
    }

    #[graphql(name = "internalID")]
    async fn internal_id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    async fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    async fn collector_level(&self) -> Option<i32> {
        self.collector_level
    }

    async fn price_range_min(&self) -> Option<i32> {
        self.price_range_min
    }

    async fn price_range_max(&self) -> Option<f64> {
        self.price_range_max
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct UpdateMyProfileMutationSuccess {
    pub user: User,
}

#[derive(SimpleObject, Debug, Clone)]
pub struct UpdateMyProfileMutationFailure {
    pub mutation_error: GravityMutationError,
}

#[derive(Union, Debug, Clone)]
#[graphql(name = "UpdateMyProfileMutation")]
pub enum UpdateMyProfileMutationType {
    Success(UpdateMyProfileMutationSuccess),
    Failure(UpdateMyProfileMutationFailure),
}

pub struct UpdateMyProfilePayload {
    client_mutation_id: Option<String>,
    outcome: UpdateMyProfileMutationType,
}

#[Object]
impl UpdateMyProfilePayload {
    async fn client_mutation_id(&self) -> Option<&str> {
        self.client_mutation_id.as_deref()
    }

    async fn user(&self) -> Option<&User> {
        match &self.outcome {
            UpdateMyProfileMutationType::Success(success) => Some(&success.user),
            UpdateMyProfileMutationType::Failure(_) => None,
        }
    }

    async fn user_or_error(&self) -> &UpdateMyProfileMutationType {
        &self.outcome
    }

    async fn me(&self, ctx: &Context<'_>) -> Option<Me> {
        load_me(ctx).await
    }
}

#[derive(Default)]
pub struct MeMutation;

#[Object]
impl MeMutation {
    /// Update the current logged in user.
    async fn update_my_profile(
        &self,
        ctx: &Context<'_>,
        input: UpdateMyProfileInput,
    ) -> async_graphql::Result<UpdateMyProfilePayload> {
        let loader = require_loader(ctx, LoaderName::UpdateMe)?;
        let params = input.to_params()?;

        let outcome = match loader.load(LoaderRequest::new(params)).await {
            Ok(response) => UpdateMyProfileMutationType::Success(UpdateMyProfileMutationSuccess {
                user: from_body(response.body)?,
            }),
            Err(e) => UpdateMyProfileMutationType::Failure(UpdateMyProfileMutationFailure {
                mutation_error: mutation_error(&e)?,
            }),
        };

        Ok(UpdateMyProfilePayload {
            client_mutation_id: input.client_mutation_id,
            outcome,
        })
    }
}
