use crate::state::AppState;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use lo_catalog::ItemQuery;
use lo_control::{Action, OptimizerState};
use lo_core::{OwnedItem, SearchRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type Reply = (StatusCode, Json<Value>);

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173").expect("valid default origin")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<axum::http::HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/inventory", post(inventory_handler))
        .route("/api/v1/request", get(request_handler))
        .route("/api/v1/optimize", post(optimize_handler))
        .route("/api/v1/actions", post(action_handler))
        .route("/api/v1/undo", post(undo_handler))
        .route("/api/v1/redo", post(redo_handler))
        .route("/api/v1/cancel", post(cancel_handler))
        .route("/api/v1/result", get(result_handler))
        .route("/api/v1/stream", get(stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn bad_request(err: &anyhow::Error) -> Reply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("{err:#}") })),
    )
}

/// Resubmits the session's search and reports the parameters it ran with.
fn submitted(app_state: &AppState, changed: bool) -> Reply {
    let generation = if changed {
        match app_state.resubmit() {
            Ok(generation) => generation,
            Err(err) => return bad_request(&err),
        }
    } else {
        app_state.worker.generation()
    };
    let session = app_state.session.lock();
    (
        StatusCode::OK,
        Json(json!({
            "changed": changed,
            "generation": generation,
            "request": session.controller.request(),
            "query": session.controller.query(),
        })),
    )
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<Value> {
    let session = app_state.session.lock();
    Json(json!({
        "content_version": app_state.worker.catalog().content_version,
        "inventory_items": session.inventory.len(),
        "generation": app_state.worker.generation(),
        "running": app_state.worker.is_running(),
        "can_undo": session.controller.can_undo(),
        "can_redo": session.controller.can_redo(),
    }))
}

pub async fn inventory_handler(
    State(app_state): State<AppState>,
    Json(inventory): Json<Vec<OwnedItem>>,
) -> Reply {
    app_state.session.lock().inventory = Arc::new(inventory);
    submitted(&app_state, true)
}

pub async fn request_handler(State(app_state): State<AppState>) -> Json<Value> {
    let session = app_state.session.lock();
    Json(json!({
        "request": session.controller.request(),
        "query": session.controller.query(),
        "saved": session.controller.saved_parameters(),
    }))
}

#[derive(Deserialize)]
pub struct OptimizeBody {
    #[serde(default)]
    request: SearchRequest,
    #[serde(default)]
    query: String,
}

/// Replaces the session parameters wholesale and starts a search.
pub async fn optimize_handler(
    State(app_state): State<AppState>,
    Json(body): Json<OptimizeBody>,
) -> Reply {
    if let Err(err) = ItemQuery::parse(&body.query) {
        return bad_request(&err);
    }
    app_state.session.lock().controller = OptimizerState::with_request(body.request, &body.query);
    submitted(&app_state, true)
}

pub async fn action_handler(
    State(app_state): State<AppState>,
    Json(action): Json<Action>,
) -> Reply {
    if let Action::SetQuery { query } = &action {
        if let Err(err) = ItemQuery::parse(query) {
            return bad_request(&err);
        }
    }
    let changed = app_state.session.lock().controller.apply(&action);
    submitted(&app_state, changed)
}

pub async fn undo_handler(State(app_state): State<AppState>) -> Reply {
    let changed = app_state.session.lock().controller.undo();
    submitted(&app_state, changed)
}

pub async fn redo_handler(State(app_state): State<AppState>) -> Reply {
    let changed = app_state.session.lock().controller.redo();
    submitted(&app_state, changed)
}

pub async fn cancel_handler(State(app_state): State<AppState>) -> Json<Value> {
    let cancelled = app_state.worker.cancel();
    Json(json!({
        "cancelled": cancelled,
        "generation": app_state.worker.generation(),
    }))
}

pub async fn result_handler(State(app_state): State<AppState>) -> Reply {
    let Some(latest) = app_state.worker.latest() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no completed search yet" })),
        );
    };
    match serde_json::to_value(&*latest.result) {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({ "generation": latest.generation, "result": result })),
        ),
        Err(err) => {
            tracing::error!("result serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "serialization failed" })),
            )
        }
    }
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.worker.subscribe();
    let worker = app_state.worker.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            let data = serde_json::to_string(&event).unwrap_or_default();
                            yield Ok(Event::default().data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let hb = json!({
                        "heartbeat": true,
                        "generation": worker.generation(),
                        "running": worker.is_running(),
                    });
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
