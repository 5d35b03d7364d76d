//! HTTP daemon speaking the obsidian-pylab plugin protocol: `GET /` lists
//! the available function endpoints, `POST /similar` returns the sectioned
//! recommendation list for one note. `/note` and `/reload` expose lookup
//! and explicit reindexing.

use std::path::Path;
use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::signal;
use tower_http::cors::CorsLayer;

use crate::{
    config::Config,
    index::{pipeline::RelatedEntry, IndexError, VaultIndex},
    notes::Note,
};

pub(crate) struct SharedState {
    config: Arc<RwLock<Config>>,
    /// Built at startup when a vault path is configured, else on the first
    /// request that carries one.
    index: RwLock<Option<Arc<VaultIndex>>>,
}

pub fn start_daemon(config: Arc<RwLock<Config>>) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(config).await });
}

async fn start_app(config: Arc<RwLock<Config>>) {
    let state = Arc::new(SharedState {
        config: config.clone(),
        index: RwLock::new(None),
    });

    // eager index build when a vault is configured; failures are retried
    // lazily per request so the daemon still comes up
    let vault_path = config.read().unwrap().vault_path.clone();
    if !vault_path.is_empty() {
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(err) = ensure_index(&state, Some(vault_path.as_str())) {
                log::error!("initial index build failed: {err:?}");
            }
        });
    }

    let listen_addr = config.read().unwrap().listen_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub(crate) fn router(state: Arc<SharedState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("app://obsidian.md".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/", get(read_root))
        .route("/similar", post(similar))
        .route("/note", post(note))
        .route("/reload", post(reload))
        .layer(cors)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

#[derive(Debug)]
enum HttpError {
    Index(IndexError),
    BadRequest(String),
}

impl From<IndexError> for HttpError {
    fn from(err: IndexError) -> Self {
        HttpError::Index(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self {
            HttpError::Index(IndexError::NoteNotFound(name)) => (
                StatusCode::NOT_FOUND,
                json!({"error": format!("note \"{name}\" not found")}).to_string(),
            ),
            HttpError::Index(err @ IndexError::CorpusUnavailable(_)) => {
                log::error!("{err:?}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({"error": err.to_string()}).to_string(),
                )
            }
            HttpError::Index(err) => {
                log::error!("{err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": err.to_string()}).to_string(),
                )
            }
            HttpError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({"error": message}).to_string())
            }
        }
        .into_response()
    }
}

/// Resolve (or build) the process-wide vault index.
fn ensure_index(
    state: &SharedState,
    vault_path: Option<&str>,
) -> Result<Arc<VaultIndex>, HttpError> {
    if let Some(index) = state.index.read().unwrap().as_ref() {
        return Ok(index.clone());
    }

    let mut guard = state.index.write().unwrap();
    if let Some(index) = guard.as_ref() {
        return Ok(index.clone());
    }

    let configured = state.config.read().unwrap().vault_path.clone();
    let path = vault_path
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .or_else(|| (!configured.is_empty()).then_some(configured))
        .ok_or_else(|| {
            HttpError::BadRequest(
                "no vault path: set vault_path in config.yaml or pass vaultPath".to_string(),
            )
        })?;

    let index = Arc::new(VaultIndex::open(path, state.config.clone())?);
    *guard = Some(index.clone());
    Ok(index)
}

async fn read_root(State(state): State<Arc<SharedState>>) -> Json<serde_json::Value> {
    let addr = state.config.read().unwrap().listen_addr.clone();
    Json(json!({
        "scripts": [format!("http://{addr}/function/similar")],
    }))
}

/// Request shape of the obsidian-pylab plugin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRequest {
    pub vault_path: Option<String>,
    pub note_path: Option<String>,
}

async fn similar(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SimilarRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    log::debug!("payload: {payload:?}");

    let note_name = payload
        .note_path
        .as_deref()
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| HttpError::BadRequest("notePath is required".to_string()))?;

    tokio::task::block_in_place(move || {
        let index = ensure_index(&state, payload.vault_path.as_deref())?;
        let entries: Vec<RelatedEntry> = index.related_to(&note_name)?;
        Ok(Json(json!({ "contents": entries })))
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteRequest {
    pub name: String,
}

async fn note(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<Note>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let index = ensure_index(&state, None)?;
        Ok(Json(index.get_note(&payload.name)?))
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadRequest {
    #[serde(default)]
    pub force_semantic_reindex: bool,
}

async fn reload(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ReloadRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let index = ensure_index(&state, None)?;
        index.reload(payload.force_semantic_reindex)?;
        Ok(Json(json!({
            "notes": index.note_count(),
            "generation": index.generation(),
        })))
    })
}

#[cfg(test)]
pub(crate) fn test_state(config: Arc<RwLock<Config>>) -> Arc<SharedState> {
    Arc::new(SharedState {
        config,
        index: RwLock::new(None),
    })
}
