//! HTTP entry point and credential extraction
//!
//! Provides helpers for:
//! - Extracting the Gravity access token and request id from HTTP headers
//! - A standard Axum handler that runs a request through the [`Gateway`]

use async_graphql::{Request, Response};
use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::gateway::Gateway;

const ACCESS_TOKEN_HEADER: &str = "x-access-token";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extract the access token from `X-Access-Token`, falling back to
/// `Authorization: Bearer <token>`
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header(ACCESS_TOKEN_HEADER)
        .or_else(|| {
            header("authorization")
                .and_then(|auth| auth.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
        })
        .map(str::to_string)
}

/// Extract `X-Request-Id`, or mint a new one
pub fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Standard GraphQL handler
///
/// Builds the request's resolver context from its headers and executes it
/// against the gateway schema.
///
/// # Example
///
/// ```rust,no_run
/// use axum::{routing::post, Extension, Router};
/// use gravity_stitching::{graphql_handler, Gateway};
/// use std::sync::Arc;
///
/// # fn example(gateway: Gateway) {
/// let app: Router = Router::new()
///     .route("/graphql", post(graphql_handler))
///     .layer(Extension(Arc::new(gateway)));
/// # }
/// ```
pub async fn graphql_handler(
    Extension(gateway): Extension<Arc<Gateway>>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> Json<Response> {
    let access_token = extract_access_token(&headers);
    let request_id = extract_request_id(&headers);
    let span = tracing::info_span!(
        "graphql",
        request_id = %request_id,
        operation = request.operation_name.as_deref().unwrap_or("anonymous"),
        authenticated = access_token.is_some(),
    );

    let context = gateway.context_for(access_token, Some(request_id));
    let response = gateway.execute(request, context).instrument(span).await;
    if response.is_err() {
        tracing::debug!(errors = response.errors.len(), "request resolved with errors");
    }

    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::loaders::{Loader, LoaderFactory, LoaderName};
    use crate::test_support::{gravity_schema, StubLoader};
    use axum::http::HeaderValue;
    use serde_json::json;
    use std::collections::HashMap;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_access_token_header() {
        assert_eq!(
            extract_access_token(&headers(&[("x-access-token", "secret")])),
            Some("secret".to_string())
        );
    }

    #[test]
    fn test_bearer_token_fallback() {
        assert_eq!(
            extract_access_token(&headers(&[("authorization", "Bearer secret")])),
            Some("secret".to_string())
        );
        assert_eq!(
            extract_access_token(&headers(&[
                ("x-access-token", "primary"),
                ("authorization", "Bearer other")
            ])),
            Some("primary".to_string())
        );
        assert_eq!(
            extract_access_token(&headers(&[("authorization", "Basic abc")])),
            None
        );
        assert_eq!(extract_access_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_request_id() {
        assert_eq!(
            extract_request_id(&headers(&[("x-request-id", "req-1")])),
            "req-1"
        );

        let minted = extract_request_id(&HeaderMap::new());
        assert!(Uuid::parse_str(&minted).is_ok());
    }

    struct MeOnly;

    impl LoaderFactory for MeOnly {
        fn loaders(&self, access_token: Option<&str>) -> HashMap<LoaderName, Arc<dyn Loader>> {
            let mut loaders = HashMap::new();
            if access_token == Some("secret") {
                let me: Arc<dyn Loader> = StubLoader::ok(json!({"id": "u1", "name": "Percy"}));
                loaders.insert(LoaderName::Me, me);
            }
            loaders
        }
    }

    #[tokio::test]
    async fn test_handler_builds_context_from_headers() {
        let gravity = gravity_schema();
        let sdl = gravity.sdl();
        let schema = Gateway::stitch(&GatewayConfig::default(), Arc::new(gravity), sdl)
            .build()
            .unwrap();
        let gateway = Arc::new(Gateway::new(schema).with_loaders(Arc::new(MeOnly)));

        let Json(response) = graphql_handler(
            Extension(gateway.clone()),
            headers(&[("authorization", "Bearer secret")]),
            Json(Request::new("{ me { name } }")),
        )
        .await;
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"me": {"name": "Percy"}})
        );

        let Json(response) = graphql_handler(
            Extension(gateway),
            HeaderMap::new(),
            Json(Request::new("{ me { name } }")),
        )
        .await;
        assert_eq!(response.data.into_json().unwrap(), json!({"me": null}));
    }
}
