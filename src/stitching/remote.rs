//! Gravity's GraphQL endpoint as a sub-schema

use async_graphql::{Response, ServerError, Value};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::SubSchema;
use crate::context::ResolverContext;

const ACCESS_TOKEN_HEADER: &str = "X-ACCESS-TOKEN";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<RemoteError>,
}

/// Executes delegated documents over HTTP
#[derive(Debug, Clone)]
pub struct RemoteSchema {
    client: reqwest::Client,
    url: Url,
}

impl RemoteSchema {
    pub fn new(url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post(
        &self,
        query: String,
        context: Option<&ResolverContext>,
    ) -> Result<RemoteResponse, reqwest::Error> {
        let mut request = self.client.post(self.url.clone()).json(&json!({ "query": query }));
        if let Some(context) = context {
            if let Some(token) = context.access_token() {
                request = request.header(ACCESS_TOKEN_HEADER, token);
            }
            if let Some(request_id) = context.request_id() {
                request = request.header(REQUEST_ID_HEADER, request_id);
            }
        }

        request.send().await?.error_for_status()?.json().await
    }
}

#[async_trait]
impl SubSchema for RemoteSchema {
    async fn execute(&self, query: String, context: Option<ResolverContext>) -> Response {
        match self.post(query, context.as_ref()).await {
            Ok(remote) => into_response(remote),
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "gravity request failed");
                Response::from_errors(vec![ServerError::new(e.to_string(), None)])
            }
        }
    }
}

fn into_response(remote: RemoteResponse) -> Response {
    let data = match remote.data.map(Value::from_json).transpose() {
        Ok(data) => data.unwrap_or(Value::Null),
        Err(e) => {
            return Response::from_errors(vec![ServerError::new(
                format!("invalid response data: {e}"),
                None,
            )])
        }
    };

    let mut response = Response::new(data);
    response.errors = remote
        .errors
        .into_iter()
        .map(|e| ServerError::new(e.message, None))
        .collect();
    response
}
