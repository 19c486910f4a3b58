//! The local schema
//!
//! Types and root fields resolved in-process from loader calls. The gateway
//! merges this schema with Gravity's.

pub mod artwork;
pub mod me;
pub mod my_collection;
pub mod partner;

use async_graphql::{Context, EmptySubscription, MergedObject, Schema};
use serde::de::DeserializeOwned;

use crate::config::GatewayConfig;
use crate::pagination::PagingArgs;
use crate::{GatewayError, Result};

#[derive(MergedObject, Default)]
pub struct Query(me::MeQuery, artwork::ArtworkQuery, partner::PartnerQuery);

#[derive(MergedObject, Default)]
pub struct Mutation(me::MeMutation, my_collection::MyCollectionMutation);

pub type LocalSchema = Schema<Query, Mutation, EmptySubscription>;

/// Build the local schema; `config` is available to resolvers as schema data
pub fn build_local_schema(config: &GatewayConfig) -> LocalSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(config.clone())
        .finish()
}

/// Deserialize a loader response body
pub(crate) fn from_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| GatewayError::UnexpectedResponse(e.to_string()))
}

/// Page size bounds for the current schema
pub(crate) fn page_sizes(ctx: &Context<'_>) -> (i32, i32) {
    match ctx.data_opt::<GatewayConfig>() {
        Some(config) => (config.default_page_size, config.max_page_size),
        None => {
            let config = GatewayConfig::default();
            (config.default_page_size, config.max_page_size)
        }
    }
}

/// Paging arguments with the default page size applied when no size was
/// requested
pub(crate) fn paging_args(
    ctx: &Context<'_>,
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
) -> Result<PagingArgs> {
    let (default_page_size, max_page_size) = page_sizes(ctx);
    let mut args = PagingArgs::new(first, after, last, before);
    args.validate(max_page_size)?;
    if args.first.is_none() && args.last.is_none() {
        args.first = Some(default_page_size);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_sdl_declares_stitched_types() {
        let sdl = build_local_schema(&GatewayConfig::default()).sdl();
        for ty in [
            "type Me",
            "type Artwork",
            "type ArtworkConnection",
            "type Partner",
            "union MyCollectionArtworkMutationType",
            "union UpdateMyProfileMutation",
            "type GravityMutationError",
        ] {
            assert!(sdl.contains(ty), "missing {ty}");
        }
    }

    #[test]
    fn test_from_body_reports_shape_errors() {
        let err = from_body::<Vec<String>>(serde_json::json!({"id": 1})).unwrap_err();
        assert!(matches!(err, GatewayError::UnexpectedResponse(_)));
    }
}
