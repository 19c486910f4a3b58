//! Fixtures shared by the unit tests

use async_graphql::connection::Connection;
use async_graphql::{
    EmptyMutation, EmptySubscription, Enum, Object, Request, Response, Schema, SimpleObject,
    Union, ID,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::config::GatewayConfig;
use crate::context::ResolverContext;
use crate::loaders::{Loader, LoaderError, LoaderRequest, LoaderResponse};
use crate::pagination::{connection_from_array, PagingArgs};
use crate::schema::{build_local_schema, LocalSchema};
use crate::stitching::SubSchema;

/// Loader with a canned outcome that records every request
pub struct StubLoader {
    outcome: Result<LoaderResponse, LoaderError>,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<LoaderRequest>>,
}

impl StubLoader {
    fn new(outcome: Result<LoaderResponse, LoaderError>, gate: Option<Arc<Semaphore>>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            gate,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(body: serde_json::Value) -> Arc<Self> {
        Self::responding(LoaderResponse::new(body))
    }

    pub fn responding(response: LoaderResponse) -> Arc<Self> {
        Self::new(Ok(response), None)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Err(LoaderError::new(message)), None)
    }

    /// Resolves only after a permit is added to `gate`, one call per permit
    pub fn gated(body: serde_json::Value, gate: Arc<Semaphore>) -> Arc<Self> {
        Self::new(Ok(LoaderResponse::new(body)), Some(gate))
    }

    pub fn requests(&self) -> Vec<LoaderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Loader for StubLoader {
    async fn load(&self, request: LoaderRequest) -> Result<LoaderResponse, LoaderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.outcome.clone()
    }
}

/// Sub-schema wrapper that records the documents sent to it
pub struct RecordingSchema {
    inner: Arc<dyn SubSchema>,
    documents: Mutex<Vec<String>>,
}

impl RecordingSchema {
    pub fn new(inner: Arc<dyn SubSchema>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            documents: Mutex::new(Vec::new()),
        })
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubSchema for RecordingSchema {
    async fn execute(&self, query: String, context: Option<ResolverContext>) -> Response {
        self.documents.lock().unwrap().push(query.clone());
        self.inner.execute(query, context).await
    }
}

pub fn local_schema() -> LocalSchema {
    build_local_schema(&GatewayConfig::default())
}

/// Run `query` against the local schema
pub async fn execute_response(query: &str, context: ResolverContext) -> Response {
    local_schema()
        .execute(Request::new(query).data(context))
        .await
}

/// Run `query` against the local schema and return its data, failing on errors
pub async fn execute(query: &str, context: ResolverContext) -> serde_json::Value {
    let response = execute_response(query, context).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    response.data.into_json().unwrap()
}

#[derive(SimpleObject, Clone)]
pub struct ViewingRoom {
    #[graphql(name = "internalID")]
    pub internal_id: ID,
    pub title: String,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    #[graphql(name = "artworkIDs")]
    pub artwork_ids: Vec<String>,
    #[graphql(name = "partnerID")]
    pub partner_id: String,
}

pub fn viewing_rooms() -> Vec<ViewingRoom> {
    vec![
        ViewingRoom {
            internal_id: ID("room-1".into()),
            title: "Spring Exhibition".into(),
            start_at: Some("2020-03-01T00:00:00Z".into()),
            end_at: Some("2020-03-14T12:00:00Z".into()),
            artwork_ids: vec!["work-1".into(), "work-2".into()],
            partner_id: "p1".into(),
        },
        ViewingRoom {
            internal_id: ID("room-2".into()),
            title: "Summer Preview".into(),
            start_at: Some("2020-03-25T12:00:00Z".into()),
            end_at: Some("2020-05-01T00:00:00Z".into()),
            artwork_ids: Vec::new(),
            partner_id: "p1".into(),
        },
        ViewingRoom {
            internal_id: ID("room-3".into()),
            title: "Elsewhere".into(),
            start_at: None,
            end_at: None,
            artwork_ids: Vec::new(),
            partner_id: "p2".into(),
        },
    ]
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum SecondFactorKind {
    Sms,
    App,
}

#[derive(SimpleObject)]
pub struct SmsSecondFactor {
    #[graphql(name = "internalID")]
    pub internal_id: ID,
    pub formatted_phone_number: String,
}

#[derive(SimpleObject)]
pub struct AppSecondFactor {
    #[graphql(name = "internalID")]
    pub internal_id: ID,
    pub name: String,
}

#[derive(Union)]
pub enum SecondFactor {
    Sms(SmsSecondFactor),
    App(AppSecondFactor),
}

/// A small stand-in for Gravity's GraphQL schema
pub struct GravityQuery;

#[Object(name = "Query")]
impl GravityQuery {
    async fn viewing_room(&self, id: ID) -> Option<ViewingRoom> {
        viewing_rooms().into_iter().find(|room| room.internal_id == id)
    }

    async fn viewing_rooms(
        &self,
        partner_id: Option<String>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
    ) -> async_graphql::Result<Connection<String, ViewingRoom>> {
        let rooms: Vec<ViewingRoom> = viewing_rooms()
            .into_iter()
            .filter(|room| partner_id.as_ref().is_none_or(|id| &room.partner_id == id))
            .collect();
        let args = PagingArgs::new(first, after, last, before);
        Ok(connection_from_array(rooms, &args)?.into_connection())
    }

    #[graphql(name = "_unused_gravity_secondFactors")]
    async fn second_factors(&self, kinds: Option<Vec<Option<SecondFactorKind>>>) -> Vec<SecondFactor> {
        let wanted = |kind| {
            kinds
                .as_ref()
                .is_none_or(|kinds| kinds.contains(&Some(kind)))
        };

        let mut factors = Vec::new();
        if wanted(SecondFactorKind::Sms) {
            factors.push(SecondFactor::Sms(SmsSecondFactor {
                internal_id: ID("sms-1".into()),
                formatted_phone_number: "+1 555 0100".into(),
            }));
        }
        if wanted(SecondFactorKind::App) {
            factors.push(SecondFactor::App(AppSecondFactor {
                internal_id: ID("app-1".into()),
                name: "Authenticator".into(),
            }));
        }
        factors
    }
}

pub type GravitySchema = Schema<GravityQuery, EmptyMutation, EmptySubscription>;

pub fn gravity_schema() -> GravitySchema {
    Schema::new(GravityQuery, EmptyMutation, EmptySubscription)
}
