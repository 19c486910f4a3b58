//! Upstream loaders
//!
//! A loader performs one authenticated call against Gravity and resolves to
//! the response body plus headers, or rejects with the transport's error
//! message (`"<url> - <json>"`). The transport itself lives outside this
//! crate; hosts plug it in through [`LoaderFactory`].

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Name of a loader carried by a resolver context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderName {
    Me,
    UpdateMe,
    FollowedShows,
    Artwork,
    Artworks,
    Partner,
    CreateArtwork,
    CreateArtworkImage,
    CreateArtworkEditionSet,
}

impl LoaderName {
    pub const ALL: [LoaderName; 9] = [
        LoaderName::Me,
        LoaderName::UpdateMe,
        LoaderName::FollowedShows,
        LoaderName::Artwork,
        LoaderName::Artworks,
        LoaderName::Partner,
        LoaderName::CreateArtwork,
        LoaderName::CreateArtworkImage,
        LoaderName::CreateArtworkEditionSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderName::Me => "meLoader",
            LoaderName::UpdateMe => "updateMeLoader",
            LoaderName::FollowedShows => "followedShowsLoader",
            LoaderName::Artwork => "artworkLoader",
            LoaderName::Artworks => "artworksLoader",
            LoaderName::Partner => "partnerLoader",
            LoaderName::CreateArtwork => "createArtworkLoader",
            LoaderName::CreateArtworkImage => "createArtworkImageLoader",
            LoaderName::CreateArtworkEditionSet => "createArtworkEditionSetLoader",
        }
    }

    /// Whether the upstream endpoint needs an access token
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            LoaderName::Artwork | LoaderName::Artworks | LoaderName::Partner
        )
    }

    /// Whether the loader changes upstream state (never memoized)
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            LoaderName::UpdateMe
                | LoaderName::CreateArtwork
                | LoaderName::CreateArtworkImage
                | LoaderName::CreateArtworkEditionSet
        )
    }
}

impl fmt::Display for LoaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for a single loader call
///
/// `id` addresses a nested resource (`/artwork/:id/images`), `params` is the
/// JSON body or query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderRequest {
    pub id: Option<String>,
    pub params: Value,
}

impl LoaderRequest {
    pub fn new(params: Value) -> Self {
        Self { id: None, params }
    }

    pub fn with_id(id: impl Into<String>, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            params,
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::with_id(id, Value::Object(Default::default()))
    }

    fn cache_key(&self) -> String {
        format!("{}|{}", self.id.as_deref().unwrap_or_default(), self.params)
    }
}

/// Body and headers of an upstream response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderResponse {
    pub body: Value,
    headers: HashMap<String, String>,
}

impl LoaderResponse {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            headers: HashMap::new(),
        }
    }

    /// Attach a header; names are matched case-insensitively
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Total size of the collection, from `x-total-count`
    pub fn total_count(&self) -> Option<usize> {
        self.header("x-total-count")
            .and_then(|v| v.trim().parse().ok())
    }
}

/// A rejected loader call
///
/// The message keeps the transport's formatting so that
/// [`crate::errors::format_gravity_error`] can recover the JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoaderError {
    pub message: String,
}

impl LoaderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One upstream call
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, request: LoaderRequest) -> Result<LoaderResponse, LoaderError>;
}

/// Loader backed by an async closure
pub struct FnLoader<F>(F);

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(LoaderRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<LoaderResponse, LoaderError>> + Send,
{
    async fn load(&self, request: LoaderRequest) -> Result<LoaderResponse, LoaderError> {
        (self.0)(request).await
    }
}

/// Wrap an async closure as a shareable loader
pub fn loader_fn<F, Fut>(f: F) -> Arc<dyn Loader>
where
    F: Fn(LoaderRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<LoaderResponse, LoaderError>> + Send + 'static,
{
    Arc::new(FnLoader(f))
}

/// Per-request memoization for read loaders
///
/// Identical requests issued while resolving one query hit upstream once.
/// Rejections are not cached.
pub struct MemoizedLoader {
    loader: Arc<dyn Loader>,
    cache: Arc<Mutex<HashMap<String, LoaderResponse>>>,
}

impl MemoizedLoader {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            loader,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Loader for MemoizedLoader {
    async fn load(&self, request: LoaderRequest) -> Result<LoaderResponse, LoaderError> {
        let key = request.cache_key();
        {
            let cache = self.cache.lock().await;
            if let Some(response) = cache.get(&key) {
                return Ok(response.clone());
            }
        }

        let response = self.loader.load(request).await?;

        {
            let mut cache = self.cache.lock().await;
            cache.insert(key, response.clone());
        }

        Ok(response)
    }
}

/// Mints the loaders for one request
pub trait LoaderFactory: Send + Sync {
    /// Loaders available for `access_token`; unauthenticated requests should
    /// only get loaders that do not [require auth](LoaderName::requires_auth).
    fn loaders(&self, access_token: Option<&str>) -> HashMap<LoaderName, Arc<dyn Loader>>;
}
