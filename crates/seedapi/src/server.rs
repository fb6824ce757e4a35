use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use seedcore::messaging::{Messenger, TelegramMessenger};
use seedcore::metadata::{MetadataStore, SupabaseMetadata};
use seedcore::storage::{ObjectStore, SupabaseStorage};
use seedcore::{AccessAuthorizer, AppResult, Config, InitDataVerifier};

use crate::handlers::{download, relay};

/// Shared state handed to every handler.
pub struct AppState {
    pub verifier: InitDataVerifier,
    pub authorizer: AccessAuthorizer,
    pub metadata: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub messenger: Arc<dyn Messenger>,
    /// Upper bound for one authorization or share write
    pub lookup_timeout: Duration,
}

impl AppState {
    pub fn new(
        verifier: InitDataVerifier,
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn ObjectStore>,
        messenger: Arc<dyn Messenger>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            authorizer: AccessAuthorizer::new(metadata.clone()),
            metadata,
            storage,
            messenger,
            lookup_timeout,
        }
    }

    /// Wires the Supabase and Telegram collaborators from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let verifier =
            InitDataVerifier::new(config.bot_token.expose_secret()).with_max_age(config.init_data_max_age);

        let metadata = SupabaseMetadata::new(
            &config.supabase_url,
            &config.supabase_service_key,
            config.request_timeout,
        )?;
        let storage = SupabaseStorage::new(
            &config.supabase_url,
            &config.supabase_service_key,
            &config.storage_bucket,
            config.request_timeout,
        )?;
        let messenger = TelegramMessenger::new(&config.bot_token, config.bot_api_url.as_ref(), config.request_timeout)?;

        Ok(Self::new(
            verifier,
            Arc::new(metadata),
            Arc::new(storage),
            Arc::new(messenger),
            config.lookup_timeout,
        ))
    }
}

/// Builds the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/file/{*path}", get(download::handle_file))
        .route("/api/download", get(download::handle_download))
        .route("/api/telegram", post(relay::handle_relay))
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves the API until the process exits
pub async fn run_server(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    log::info!("🌐 Starting SeedNote API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "seednote-api"
    }))
}
