use std::net::SocketAddr;

use axum::extract::{Query, Request, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Method;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{ApiError, ErrorCode, Event, SystemConfig, SCHEMA_VERSION_V1};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::{BootstrapError, IdentityError, LogStats, StepResult, SystemBootstrap, SystemSnapshot};

const DEFAULT_EVENT_LIMIT: usize = 50;
const MAX_EVENT_LIMIT: usize = 1000;
const MAX_MOVE_STEP: i64 = 1;

include!("error.rs");
include!("state.rs");
include!("routes/control.rs");
include!("routes/query.rs");
include!("util.rs");

pub async fn serve(addr: SocketAddr, config: SystemConfig) -> Result<(), ServerError> {
    let system = SystemBootstrap::open(config)?;
    let app = router(AppState::new(system));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "dashboard api listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/snapshot", get(get_snapshot))
        .route("/api/v1/events", get(get_events))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/move", post(post_move))
        .route("/api/v1/step", post(post_step))
        .route("/api/v1/autonomy", post(post_autonomy))
        .route("/api/v1/cognition", post(post_cognition))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
