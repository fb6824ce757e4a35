//! Common test utilities
//!
//! Shared by the router integration tests: a state wired to in-memory
//! collaborators and helpers for signed requests.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use seedapi::{create_router, AppState};
use seedcore::auth::sign_init_data;
use seedcore::testing::{InMemoryMetadata, InMemoryStorage, RecordingMessenger};
use seedcore::InitDataVerifier;

pub const BOT_TOKEN: &str = "123456:TEST-TOKEN";

/// Collaborators behind a router, kept so tests can inspect them.
pub struct TestEnvironment {
    pub metadata: Arc<InMemoryMetadata>,
    pub storage: Arc<InMemoryStorage>,
    pub messenger: Arc<RecordingMessenger>,
    pub router: Router,
}

impl TestEnvironment {
    pub fn new(metadata: InMemoryMetadata, storage: InMemoryStorage, messenger: RecordingMessenger) -> Self {
        Self::build(metadata, storage, messenger, InitDataVerifier::new(BOT_TOKEN), Duration::from_secs(5))
    }

    pub fn with_timeout(
        metadata: InMemoryMetadata,
        storage: InMemoryStorage,
        messenger: RecordingMessenger,
        lookup_timeout: Duration,
    ) -> Self {
        Self::build(metadata, storage, messenger, InitDataVerifier::new(BOT_TOKEN), lookup_timeout)
    }

    /// Environment whose verifier rejects init data older than `max_age`.
    pub fn with_max_age(
        metadata: InMemoryMetadata,
        storage: InMemoryStorage,
        messenger: RecordingMessenger,
        max_age: Duration,
    ) -> Self {
        let verifier = InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(max_age));
        Self::build(metadata, storage, messenger, verifier, Duration::from_secs(5))
    }

    fn build(
        metadata: InMemoryMetadata,
        storage: InMemoryStorage,
        messenger: RecordingMessenger,
        verifier: InitDataVerifier,
        lookup_timeout: Duration,
    ) -> Self {
        let metadata = Arc::new(metadata);
        let storage = Arc::new(storage);
        let messenger = Arc::new(messenger);

        let state = AppState::new(
            verifier,
            metadata.clone(),
            storage.clone(),
            messenger.clone(),
            lookup_timeout,
        );

        Self {
            metadata,
            storage,
            messenger,
            router: create_router(Arc::new(state)),
        }
    }

    /// Sends one request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse { status, headers, body }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// GET request, with init data in the header when given.
pub fn get(uri: &str, init_data: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(init_data) = init_data {
        builder = builder.header("X-Telegram-Init-Data", init_data);
    }
    builder.body(Body::empty()).unwrap()
}

/// Init data for `user_id`, signed with [`BOT_TOKEN`].
pub fn signed_init_data(user_id: i64) -> String {
    signed_init_data_at(user_id, 1_700_000_000)
}

/// Init data for `user_id` issued at `auth_date` (Unix seconds).
pub fn signed_init_data_at(user_id: i64, auth_date: i64) -> String {
    sign_init_data(
        [
            ("auth_date", auth_date.to_string()),
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc".to_string()),
            ("user", format!(r#"{{"id":{},"first_name":"Test","username":"tester"}}"#, user_id)),
        ],
        BOT_TOKEN,
    )
}
