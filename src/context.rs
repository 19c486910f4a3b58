//! Request-scoped resolver context
//!
//! One [`ResolverContext`] is created per incoming request and attached to the
//! GraphQL request as data. Delegated sub-queries receive a clone of it, so a
//! loader never runs with another request's token.

use async_graphql::Context;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::loaders::{Loader, LoaderFactory, LoaderName, MemoizedLoader};
use crate::{GatewayError, Result};

/// Access token plus the loaders minted for it
#[derive(Clone, Default)]
pub struct ResolverContext {
    access_token: Option<String>,
    request_id: Option<String>,
    loaders: HashMap<LoaderName, Arc<dyn Loader>>,
}

impl ResolverContext {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            access_token,
            ..Default::default()
        }
    }

    /// Context for a request without credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a context from a factory; read loaders are memoized for the
    /// lifetime of this context.
    pub fn from_factory(factory: &dyn LoaderFactory, access_token: Option<String>) -> Self {
        let loaders = factory
            .loaders(access_token.as_deref())
            .into_iter()
            .map(|(name, loader)| {
                let loader: Arc<dyn Loader> = if name.is_mutation() {
                    loader
                } else {
                    Arc::new(MemoizedLoader::new(loader))
                };
                (name, loader)
            })
            .collect();

        Self {
            access_token,
            request_id: None,
            loaders,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_loader(mut self, name: LoaderName, loader: Arc<dyn Loader>) -> Self {
        self.loaders.insert(name, loader);
        self
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Loader for a read path; `None` means the feature is unavailable
    pub fn loader(&self, name: LoaderName) -> Option<&Arc<dyn Loader>> {
        self.loaders.get(&name)
    }

    /// Loader for a mutation path; absence is a hard error
    pub fn require_loader(&self, name: LoaderName) -> Result<&Arc<dyn Loader>> {
        self.loaders
            .get(&name)
            .ok_or(GatewayError::MissingLoader(name))
    }
}

impl fmt::Debug for ResolverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut loaders: Vec<&str> = self.loaders.keys().map(LoaderName::as_str).collect();
        loaders.sort_unstable();
        f.debug_struct("ResolverContext")
            .field("authenticated", &self.is_authenticated())
            .field("request_id", &self.request_id)
            .field("loaders", &loaders)
            .finish()
    }
}

/// Get a read loader, treating a missing context like a missing loader
pub fn read_loader<'a>(ctx: &Context<'a>, name: LoaderName) -> Option<&'a Arc<dyn Loader>> {
    let loader = ctx
        .data_opt::<ResolverContext>()
        .and_then(|context| context.loader(name));
    if loader.is_none() {
        tracing::debug!(loader = %name, "loader unavailable, resolving to null");
    }
    loader
}

/// Get a loader a mutation cannot run without
pub fn require_loader<'a>(ctx: &Context<'a>, name: LoaderName) -> Result<&'a Arc<dyn Loader>> {
    ctx.data_opt::<ResolverContext>()
        .ok_or(GatewayError::MissingLoader(name))?
        .require_loader(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::{loader_fn, LoaderRequest, LoaderResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        calls: Arc<AtomicUsize>,
    }

    impl LoaderFactory for CountingFactory {
        fn loaders(&self, access_token: Option<&str>) -> HashMap<LoaderName, Arc<dyn Loader>> {
            let mut loaders = HashMap::new();
            for name in LoaderName::ALL {
                if name.requires_auth() && access_token.is_none() {
                    continue;
                }
                let calls = self.calls.clone();
                loaders.insert(
                    name,
                    loader_fn(move |_request: LoaderRequest| {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(LoaderResponse::new(json!({})))
                        }
                    }),
                );
            }
            loaders
        }
    }

    #[test]
    fn test_anonymous_context_has_no_loaders() {
        let context = ResolverContext::anonymous();
        assert!(!context.is_authenticated());
        assert!(context.loader(LoaderName::Me).is_none());
        assert!(matches!(
            context.require_loader(LoaderName::CreateArtwork),
            Err(GatewayError::MissingLoader(LoaderName::CreateArtwork))
        ));
    }

    #[test]
    fn test_missing_loader_error_names_the_loader() {
        let context = ResolverContext::anonymous();
        let err = context.require_loader(LoaderName::UpdateMe).err().unwrap();
        assert!(err.to_string().contains("updateMeLoader"));
    }

    #[test]
    fn test_factory_respects_authentication() {
        let factory = CountingFactory {
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let anonymous = ResolverContext::from_factory(&factory, None);
        assert!(anonymous.loader(LoaderName::Artwork).is_some());
        assert!(anonymous.loader(LoaderName::Me).is_none());

        let authenticated = ResolverContext::from_factory(&factory, Some("token".into()));
        assert_eq!(authenticated.access_token(), Some("token"));
        assert!(authenticated.loader(LoaderName::Me).is_some());
    }

    #[tokio::test]
    async fn test_factory_memoizes_reads_but_not_mutations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            calls: calls.clone(),
        };
        let context = ResolverContext::from_factory(&factory, Some("token".into()));

        let me = context.loader(LoaderName::Me).unwrap();
        me.load(LoaderRequest::default()).await.unwrap();
        me.load(LoaderRequest::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let create = context.require_loader(LoaderName::CreateArtwork).unwrap();
        create.load(LoaderRequest::default()).await.unwrap();
        create.load(LoaderRequest::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let context = ResolverContext::new(Some("secret".into())).with_request_id("req-1");
        let debug = format!("{:?}", context);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("req-1"));
    }
}
