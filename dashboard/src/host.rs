use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use ovenwatch_common::{ChamberId, ChamberRegistry, CommandError, CycleId, RuntimeConfig};

const DEFAULT_CONFIG_PATH: &str = "./ovenwatch.json";

#[derive(Clone)]
struct AppState {
    registry: Arc<Mutex<ChamberRegistry>>,
}

impl AppState {
    fn new(registry: ChamberRegistry) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("OVENWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut runtime = load_runtime_config(&config_path)
        .await
        .unwrap_or_else(|err| {
            warn!(
                "failed to load runtime config from {}: {err:#}",
                config_path.display()
            );
            RuntimeConfig::default()
        });
    runtime.sanitize();

    let port = std::env::var("OVENWATCH_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.http.port);

    let registry = ChamberRegistry::new(runtime.fleet.clone(), epoch_ms())
        .context("invalid fleet configuration")?;
    info!(
        "fleet initialized: {} chambers, {} cycles, {}",
        registry.len(),
        registry.cycles().len(),
        registry.system_status().as_str()
    );

    let app = router(AppState::new(registry));

    let addr: SocketAddr = format!("{}:{port}", runtime.http.bind_addr)
        .parse()
        .with_context(|| format!("invalid bind address {}", runtime.http.bind_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard server at {addr}"))?;

    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/cycles", get(handle_get_cycles))
        .route("/api/chambers", get(handle_get_chambers))
        .route("/api/chambers/{id}", get(handle_get_chamber))
        .route("/api/chambers/{id}/events", get(handle_get_events))
        .route("/api/chambers/{id}/start", post(handle_start))
        .route("/api/chambers/{id}/stop", post(handle_stop))
        .route("/api/chambers/{id}/resume", post(handle_resume))
        .route("/api/chambers/{id}/cycle", post(handle_apply_cycle))
        .route("/api/chambers/{id}/power/failure", post(handle_power_failure))
        .route(
            "/api/chambers/{id}/power/restored",
            post(handle_power_restored),
        )
        .route(
            "/api/chambers/{id}/temperature",
            post(handle_record_temperature),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.lock().await;
    Json(registry.fleet_status(epoch_ms()))
}

async fn handle_get_cycles(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.lock().await;
    Json(registry.cycles().to_vec())
}

async fn handle_get_chambers(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.lock().await;
    Json(registry.snapshot(epoch_ms()))
}

async fn handle_get_chamber(
    State(state): State<AppState>,
    Path(id): Path<ChamberId>,
) -> Response {
    let registry = state.registry.lock().await;
    match registry.chamber(id, epoch_ms()) {
        Ok(chamber) => Json(chamber).into_response(),
        Err(err) => command_error_response(&err),
    }
}

async fn handle_get_events(State(state): State<AppState>, Path(id): Path<ChamberId>) -> Response {
    let registry = state.registry.lock().await;
    match registry.events(id) {
        Ok(events) => Json(events).into_response(),
        Err(err) => command_error_response(&err),
    }
}

async fn handle_start(State(state): State<AppState>, Path(id): Path<ChamberId>) -> Response {
    run_command(&state, id, "start", |registry, now_ms| {
        registry.start(id, now_ms)
    })
    .await
}

async fn handle_stop(State(state): State<AppState>, Path(id): Path<ChamberId>) -> Response {
    run_command(&state, id, "stop", |registry, now_ms| registry.stop(id, now_ms)).await
}

async fn handle_resume(State(state): State<AppState>, Path(id): Path<ChamberId>) -> Response {
    run_command(&state, id, "resume", |registry, now_ms| {
        registry.resume(id, now_ms)
    })
    .await
}

async fn handle_apply_cycle(
    State(state): State<AppState>,
    Path(id): Path<ChamberId>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let Ok(cycle_id) = value.parse::<CycleId>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid cycle id");
    };

    run_command(&state, id, "apply cycle", |registry, now_ms| {
        registry.apply_cycle(id, cycle_id, now_ms)
    })
    .await
}

async fn handle_power_failure(
    State(state): State<AppState>,
    Path(id): Path<ChamberId>,
) -> Response {
    run_command(&state, id, "power failure", |registry, now_ms| {
        registry.signal_power_failure(id, now_ms)
    })
    .await
}

async fn handle_power_restored(
    State(state): State<AppState>,
    Path(id): Path<ChamberId>,
) -> Response {
    run_command(&state, id, "power restored", |registry, now_ms| {
        registry.signal_power_restored(id, now_ms)
    })
    .await
}

async fn handle_record_temperature(
    State(state): State<AppState>,
    Path(id): Path<ChamberId>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };
    let Ok(celsius) = value.parse::<f32>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    run_command(&state, id, "temperature sample", |registry, _| {
        registry.record_temperature(id, celsius)
    })
    .await
}

async fn run_command<F>(state: &AppState, id: ChamberId, label: &str, command: F) -> Response
where
    F: FnOnce(&mut ChamberRegistry, u64) -> Result<(), CommandError>,
{
    let now_ms = epoch_ms();
    let mut registry = state.registry.lock().await;

    if let Err(err) = command(&mut registry, now_ms) {
        warn!("chamber {id}: {label} rejected: {err}");
        return command_error_response(&err);
    }

    info!(
        "chamber {id}: {label} accepted, system status: {}",
        registry.system_status().as_str()
    );
    match registry.chamber(id, now_ms) {
        Ok(chamber) => Json(chamber).into_response(),
        Err(err) => command_error_response(&err),
    }
}

async fn load_runtime_config(path: &FsPath) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
            .with_context(|| format!("malformed runtime config {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn command_error_status(err: &CommandError) -> StatusCode {
    match err {
        CommandError::ChamberNotFound(_) | CommandError::CycleNotFound(_) => StatusCode::NOT_FOUND,
        CommandError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CommandError::InvalidTemperature(_) => StatusCode::BAD_REQUEST,
    }
}

fn command_error_response(err: &CommandError) -> Response {
    error_response(command_error_status(err), &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn epoch_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
