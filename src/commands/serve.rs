use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::controllers::paste::{self, now_millis, resolve_now, TEST_NOW_HEADER};
use crate::storage::{AnyStore, PasteStore};
use crate::types::api::{CreatePaste, Health, Status};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    info!(
        "serving on {addr} with {kind:?} storage",
        kind = app.store.kind()
    );

    axum::Server::bind(&addr)
        .serve(router(app).into_make_service())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    let max_upload_size = app.config.limits.max_upload_size;

    Router::new()
        .route("/api/pastes", post(create_paste))
        .route("/api/pastes/:id", get(get_paste))
        .route("/api/healthz", get(healthz))
        .route("/api/status", get(status))
        .route("/p/:id", get(get_paste_text))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

/// The time a read is evaluated at, honoring the test header in test mode.
fn request_now(app: &App, headers: &HeaderMap) -> crate::ApiResult<i64> {
    // a non-UTF-8 value is passed on as empty so it fails to parse in test mode
    let override_ms = headers
        .get(TEST_NOW_HEADER)
        .map(|value| value.to_str().unwrap_or_default());
    resolve_now(app.config.test_mode, override_ms)
}

async fn create_paste(
    State(app): State<App>,
    payload: Result<Json<CreatePaste>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let created = paste::create(&app, request, now_millis()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_paste(
    State(app): State<App>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> crate::ApiResult<impl IntoResponse> {
    let now = request_now(&app, &headers)?;
    Ok(Json(paste::view(&app, &id, now).await?))
}

/// The access URL handed out on creation: the bare content as plain text.
async fn get_paste_text(
    State(app): State<App>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> crate::ApiResult<String> {
    let now = request_now(&app, &headers)?;
    Ok(paste::view(&app, &id, now).await?.content)
}

async fn healthz(State(store): State<AnyStore>) -> impl IntoResponse {
    if store.is_ready().await {
        (StatusCode::OK, Json(Health { ok: true }))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(Health { ok: false }))
    }
}

async fn status(State(app): State<App>) -> Json<Status> {
    Json(Status {
        status: "ok",
        persistence: app.store.kind(),
        test_mode: app.config.test_mode,
    })
}
