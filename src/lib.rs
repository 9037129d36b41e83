pub mod config;
pub mod db;
pub mod errors;
pub mod models;

use crate::config::ServerConfig;
use crate::db::{Database, SavedPokemon};
use crate::errors::{AppError, AppResult};
use crate::models::{PokemonRecord, SavePokemonPayload, SaveQuery};
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::future::Future;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::Instrument;
use tracing_appender::non_blocking::WorkerGuard;
use uuid::Uuid;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Clone, Debug)]
pub struct AppState {
    db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/save", post(save_pokemon).fallback(method_not_served))
        .with_state(state)
}

/// Any method other than POST on `/api/save` answers 404 with no body.
async fn method_not_served() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn save_pokemon(
    State(state): State<AppState>,
    query: Result<Query<SaveQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<PokemonRecord>, AppError> {
    let span = tracing::info_span!("save_pokemon", request_id = %Uuid::new_v4());
    async move {
        let result = handle_save(&state, query, &body).await;
        match &result {
            Ok(saved) => tracing::info!(
                pokemon_id = saved.pokemon.id,
                box_id = saved.pokemon.box_id,
                box_created = saved.box_created,
                "pokemon saved"
            ),
            Err(AppError::InvalidInput(detail)) => tracing::warn!(detail = %detail, "save rejected"),
            Err(error) => tracing::error!(error = %error, "save failed"),
        }
        result.map(|saved| Json(saved.pokemon))
    }
    .instrument(span)
    .await
}

async fn handle_save(
    state: &AppState,
    query: Result<Query<SaveQuery>, QueryRejection>,
    body: &[u8],
) -> AppResult<SavedPokemon> {
    let Query(query) = query.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let box_id = query.parse_box_id()?;
    let payload = SavePokemonPayload::from_body(body)?;

    let saved = state.db.save_pokemon(box_id, payload.name).await?;
    if saved.box_created {
        tracing::info!(box_id, "created box");
    }
    Ok(saved)
}

/// Opens the store, binds the listener and serves until `shutdown` resolves.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let db = Database::open(&config.database_path, config.pool_size)?;
    tracing::info!(
        path = %db.path().display(),
        pool_size = config.pool_size,
        "database ready"
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(AppState::new(db)))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

pub fn init_tracing(log_dir: Option<&Path>) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let installed = match log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "pokebox.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };
    installed.map_err(|error| AppError::Internal(error.to_string()))
}
