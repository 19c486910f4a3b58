//! Creating artworks in a collector's collection
//!
//! The artwork is created first; images and the edition set are then added
//! one call at a time, since Gravity races on concurrent writes to the same
//! artwork. Nothing is rolled back when a follow-up call fails.

use async_graphql::connection::{Edge, EmptyFields};
use async_graphql::{Context, Enum, InputObject, Object, SimpleObject, Union};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, LazyLock};

use crate::context::require_loader;
use crate::errors::{mutation_error, GravityMutationError};
use crate::loaders::{Loader, LoaderError, LoaderName, LoaderRequest};
use crate::pagination::CursorCodec;
use crate::schema::artwork::Artwork;
use crate::schema::from_body;
use crate::GatewayError;

static S3_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://([^.]+)\.s3\.amazonaws\.com/(.+)$").expect("must be valid")
});

#[derive(Enum, Serialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ArtworkImportSource {
    Convection,
    MyCollection,
}

#[derive(InputObject, Serialize, Debug, Clone, Default)]
pub struct MyCollectionCreateArtworkInput {
    #[serde(skip)]
    pub client_mutation_id: Option<String>,
    pub artist_ids: Vec<String>,
    pub artwork_location: Option<String>,
    pub category: Option<String>,
    pub cost_currency_code: Option<String>,
    pub cost_minor: Option<i32>,
    pub date: Option<String>,
    pub depth: Option<String>,
    #[serde(skip)]
    pub edition_number: Option<String>,
    #[serde(skip)]
    pub edition_size: Option<String>,
    #[serde(skip)]
    pub external_image_urls: Option<Vec<String>>,
    pub height: Option<String>,
    pub import_source: Option<ArtworkImportSource>,
    #[serde(skip)]
    pub is_edition: Option<bool>,
    pub medium: Option<String>,
    pub metric: Option<String>,
    pub price_paid_cents: Option<i64>,
    pub price_paid_currency: Option<String>,
    pub provenance: Option<String>,
    pub title: Option<String>,
    pub width: Option<String>,
}

impl MyCollectionCreateArtworkInput {
    /// Upstream payload for the create call; follow-up fields are left out
    pub fn to_params(&self) -> serde_json::Result<Value> {
        let value = serde_json::to_value(self)?;
        Ok(match value {
            Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
            other => other,
        })
    }
}

/// Where Gravity should copy an uploaded image from
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub source_bucket: String,
    pub source_key: String,
}

/// Image sources for the URLs that point into an S3 bucket; others are skipped
pub fn compute_image_sources(urls: &[String]) -> Vec<ImageSource> {
    urls.iter()
        .filter_map(|url| {
            let captures = S3_URL.captures(url)?;
            Some(ImageSource {
                source_bucket: captures.get(1)?.as_str().to_string(),
                source_key: captures.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Edition set payload, or `None` when no edition set should be created
pub fn edition_set_params(input: &MyCollectionCreateArtworkInput) -> Option<Value> {
    let mut params = Map::new();
    if let Some(size) = &input.edition_size {
        params.insert("edition_size".to_string(), json!(size));
    }
    if let Some(number) = &input.edition_number {
        params.insert("available_editions".to_string(), json!([number]));
    }

    if params.is_empty() && input.is_edition != Some(true) {
        return None;
    }
    Some(Value::Object(params))
}

#[derive(SimpleObject)]
pub struct MyCollectionArtworkMutationSuccess {
    pub artwork: Artwork,
    pub artwork_edge: Edge<String, Artwork, EmptyFields>,
}

#[derive(SimpleObject)]
pub struct MyCollectionArtworkMutationFailure {
    pub mutation_error: GravityMutationError,
}

#[derive(Union)]
pub enum MyCollectionArtworkMutationType {
    Success(MyCollectionArtworkMutationSuccess),
    Failure(MyCollectionArtworkMutationFailure),
}

#[derive(SimpleObject)]
pub struct MyCollectionCreateArtworkPayload {
    pub client_mutation_id: Option<String>,
    pub artwork_or_error: MyCollectionArtworkMutationType,
}

/// The loaders one creation needs
struct ArtworkCreation<'a> {
    create: &'a Arc<dyn Loader>,
    create_image: &'a Arc<dyn Loader>,
    create_edition_set: &'a Arc<dyn Loader>,
    artwork: &'a Arc<dyn Loader>,
}

impl ArtworkCreation<'_> {
    async fn run(
        &self,
        input: &MyCollectionCreateArtworkInput,
    ) -> async_graphql::Result<MyCollectionArtworkMutationType> {
        let created = match self.create.load(LoaderRequest::new(input.to_params()?)).await {
            Ok(response) => response,
            Err(e) => return failure(&e),
        };
        let artwork_id = created
            .body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::UnexpectedResponse("created artwork has no id".to_string()))?
            .to_string();

        let urls = input.external_image_urls.as_deref().unwrap_or_default();
        for source in compute_image_sources(urls) {
            let request = LoaderRequest::with_id(&artwork_id, serde_json::to_value(&source)?);
            if let Err(e) = self.create_image.load(request).await {
                return failure(&e);
            }
        }

        if let Some(params) = edition_set_params(input) {
            let request = LoaderRequest::with_id(&artwork_id, params);
            if let Err(e) = self.create_edition_set.load(request).await {
                return failure(&e);
            }
        }

        let artwork: Artwork = match self.artwork.load(LoaderRequest::by_id(&artwork_id)).await {
            Ok(response) => from_body(response.body)?,
            Err(e) => return failure(&e),
        };

        tracing::info!(artwork_id = %artwork_id, "created collection artwork");
        Ok(MyCollectionArtworkMutationType::Success(
            MyCollectionArtworkMutationSuccess {
                artwork_edge: Edge::new(CursorCodec::from_offset(0), artwork.clone()),
                artwork,
            },
        ))
    }
}

fn failure(err: &LoaderError) -> async_graphql::Result<MyCollectionArtworkMutationType> {
    Ok(MyCollectionArtworkMutationType::Failure(
        MyCollectionArtworkMutationFailure {
            mutation_error: mutation_error(err)?,
        },
    ))
}

#[derive(Default)]
pub struct MyCollectionMutation;

#[Object]
impl MyCollectionMutation {
    /// Create an artwork in the current user's collection
    async fn my_collection_create_artwork(
        &self,
        ctx: &Context<'_>,
        input: MyCollectionCreateArtworkInput,
    ) -> async_graphql::Result<MyCollectionCreateArtworkPayload> {
        let creation = ArtworkCreation {
            create: require_loader(ctx, LoaderName::CreateArtwork)?,
            create_image: require_loader(ctx, LoaderName::CreateArtworkImage)?,
            create_edition_set: require_loader(ctx, LoaderName::CreateArtworkEditionSet)?,
            artwork: require_loader(ctx, LoaderName::Artwork)?,
        };
        let artwork_or_error = creation.run(&input).await?;

        Ok(MyCollectionCreateArtworkPayload {
            client_mutation_id: input.client_mutation_id,
            artwork_or_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResolverContext;
    use crate::test_support::{execute, execute_response, local_schema, StubLoader};
    use async_graphql::Request;
    use tokio::sync::Semaphore;
    use tokio_test::{assert_pending, assert_ready};

    const IMAGE: &str = "https://test-upload-bucket.s3.amazonaws.com/path/to/image.jpg";
    const OTHER_IMAGE: &str = "https://test-upload-bucket.s3.amazonaws.com/path/to/other/image.jpg";

    struct Loaders {
        create: Arc<StubLoader>,
        create_image: Arc<StubLoader>,
        create_edition_set: Arc<StubLoader>,
        artwork: Arc<StubLoader>,
    }

    impl Loaders {
        fn new() -> Self {
            Self {
                create: StubLoader::ok(json!({"id": "some-artwork-id"})),
                create_image: StubLoader::ok(json!({})),
                create_edition_set: StubLoader::ok(json!({})),
                artwork: StubLoader::ok(json!({
                    "medium": "Painting",
                    "price_paid_cents": 10000,
                    "price_paid_currency": "USD",
                    "artwork_location": "Berlin",
                    "attribution_class": "open edition"
                })),
            }
        }

        fn context(&self) -> ResolverContext {
            ResolverContext::new(Some("token".into()))
                .with_loader(LoaderName::CreateArtwork, self.create.clone())
                .with_loader(LoaderName::CreateArtworkImage, self.create_image.clone())
                .with_loader(LoaderName::CreateArtworkEditionSet, self.create_edition_set.clone())
                .with_loader(LoaderName::Artwork, self.artwork.clone())
        }
    }

    fn mutation(extra: &str) -> String {
        format!(
            r#"mutation {{
                myCollectionCreateArtwork(input: {{
                    artistIds: ["4d8b92b34eb68a1b2c0003f4"]
                    category: "some strange category"
                    costCurrencyCode: "USD"
                    costMinor: 200
                    date: "1990"
                    height: "20"
                    width: "20"
                    artworkLocation: "Berlin"
                    medium: "Painting"
                    metric: "in"
                    pricePaidCents: 10000
                    pricePaidCurrency: "USD"
                    title: "hey now"
                    importSource: CONVECTION
                    {extra}
                }}) {{
                    artworkOrError {{
                        ... on MyCollectionArtworkMutationSuccess {{
                            artwork {{ medium artworkLocation pricePaid {{ display }} }}
                            artworkEdge {{ node {{ medium attributionClass {{ name }} }} }}
                        }}
                        ... on MyCollectionArtworkMutationFailure {{
                            mutationError {{ message }}
                        }}
                    }}
                }}
            }}"#
        )
    }

    #[tokio::test]
    async fn test_returns_details_of_the_new_artwork() {
        let loaders = Loaders::new();
        let data = execute(&mutation(""), loaders.context()).await;

        assert_eq!(
            data["myCollectionCreateArtwork"]["artworkOrError"],
            json!({
                "artwork": {
                    "medium": "Painting",
                    "artworkLocation": "Berlin",
                    "pricePaid": {"display": "$100"}
                },
                "artworkEdge": {
                    "node": {"medium": "Painting", "attributionClass": {"name": "Open edition"}}
                }
            })
        );

        let params = &loaders.create.requests()[0].params;
        assert_eq!(params["artist_ids"], json!(["4d8b92b34eb68a1b2c0003f4"]));
        assert_eq!(params["cost_currency_code"], json!("USD"));
        assert_eq!(params["cost_minor"], json!(200));
        assert_eq!(params["price_paid_cents"], json!(10000));
        assert_eq!(params["import_source"], json!("convection"));
        assert!(params.get("external_image_urls").is_none());
        assert_eq!(
            loaders.artwork.requests()[0].id.as_deref(),
            Some("some-artwork-id")
        );
    }

    #[tokio::test]
    async fn test_primary_failure_short_circuits() {
        let mut loaders = Loaders::new();
        loaders.create = StubLoader::failing(
            r#"https://stagingapi.artsy.net/api/v1/my_collection?id=some-artwork-id - {"error":"Error creating artwork"}"#,
        );

        let data = execute(&mutation(&format!("externalImageUrls: [\"{IMAGE}\"]")), loaders.context()).await;
        assert_eq!(
            data["myCollectionCreateArtwork"]["artworkOrError"],
            json!({"mutationError": {"message": "Error creating artwork"}})
        );
        assert!(loaders.create_image.requests().is_empty());
        assert!(loaders.artwork.requests().is_empty());
    }

    #[tokio::test]
    async fn test_creates_image_from_bucket_and_key() {
        let loaders = Loaders::new();
        let extra = format!(r#"externalImageUrls: ["{IMAGE}", "http://example.com/path/to/image.jpg"]"#);
        let data = execute(&mutation(&extra), loaders.context()).await;

        assert!(data["myCollectionCreateArtwork"]["artworkOrError"]
            .get("artwork")
            .is_some());
        let requests = loaders.create_image.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id.as_deref(), Some("some-artwork-id"));
        assert_eq!(
            requests[0].params,
            json!({"source_bucket": "test-upload-bucket", "source_key": "path/to/image.jpg"})
        );
    }

    #[tokio::test]
    async fn test_image_failure_yields_failure_variant() {
        let mut loaders = Loaders::new();
        loaders.create_image = StubLoader::failing(
            r#"https://stagingapi.artsy.net/api/v1/artwork/some-artwork-id/images - {"error":"Error creating image"}"#,
        );

        let data = execute(&mutation(&format!("externalImageUrls: [\"{IMAGE}\"]")), loaders.context()).await;
        assert_eq!(
            data["myCollectionCreateArtwork"]["artworkOrError"],
            json!({"mutationError": {"message": "Error creating image"}})
        );
        assert_eq!(loaders.create.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_creates_images_in_sequence() {
        let gate = Arc::new(Semaphore::new(0));
        let mut loaders = Loaders::new();
        loaders.create_image = StubLoader::gated(json!({}), gate.clone());

        let schema = local_schema();
        let query = mutation(&format!(r#"externalImageUrls: ["{IMAGE}", "{OTHER_IMAGE}"]"#));
        let mut task =
            tokio_test::task::spawn(schema.execute(Request::new(query).data(loaders.context())));

        assert_pending!(task.poll());
        let requests = loaders.create_image.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].params["source_key"], json!("path/to/image.jpg"));

        gate.add_permits(1);
        assert_pending!(task.poll());
        let requests = loaders.create_image.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].params["source_key"], json!("path/to/other/image.jpg"));

        gate.add_permits(1);
        let response = assert_ready!(task.poll());
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_edition_set_created_after_primary_call() {
        let loaders = Loaders::new();
        execute(
            &mutation(r#"editionNumber: "50" editionSize: "100""#),
            loaders.context(),
        )
        .await;

        let requests = loaders.create_edition_set.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id.as_deref(), Some("some-artwork-id"));
        assert_eq!(
            requests[0].params,
            json!({"edition_size": "100", "available_editions": ["50"]})
        );
    }

    #[tokio::test]
    async fn test_no_edition_set_without_edition_fields() {
        let loaders = Loaders::new();
        execute(&mutation(""), loaders.context()).await;
        assert!(loaders.create_edition_set.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_loader_is_fatal() {
        let context = ResolverContext::new(Some("token".into()))
            .with_loader(LoaderName::CreateArtwork, StubLoader::ok(json!({"id": "a"})));

        let response = execute_response(&mutation(""), context).await;
        assert_eq!(
            response.errors[0].message,
            "No createArtworkImageLoader found in resolver context"
        );
    }

    #[test]
    fn test_edition_set_params() {
        let with = |size: Option<&str>, number: Option<&str>, is_edition: Option<bool>| {
            edition_set_params(&MyCollectionCreateArtworkInput {
                edition_size: size.map(str::to_string),
                edition_number: number.map(str::to_string),
                is_edition,
                ..Default::default()
            })
        };

        assert_eq!(
            with(Some("100"), Some("50"), None),
            Some(json!({"edition_size": "100", "available_editions": ["50"]}))
        );
        assert_eq!(
            with(None, Some("50"), None),
            Some(json!({"available_editions": ["50"]}))
        );
        assert_eq!(with(Some("50"), None, None), Some(json!({"edition_size": "50"})));
        assert_eq!(with(None, None, Some(true)), Some(json!({})));
        assert_eq!(with(None, None, None), None);
        assert_eq!(with(None, None, Some(false)), None);
    }

    #[test]
    fn test_compute_image_sources() {
        assert!(compute_image_sources(&[]).is_empty());
        assert!(compute_image_sources(&["http://example.com/path/to/image.jpg".to_string()]).is_empty());

        let sources = compute_image_sources(&[
            "http://example.com/path/to/image.jpg".to_string(),
            IMAGE.to_string(),
        ]);
        assert_eq!(
            sources,
            vec![ImageSource {
                source_bucket: "test-upload-bucket".to_string(),
                source_key: "path/to/image.jpg".to_string(),
            }]
        );
    }
}
