//! Web server module

mod error;
mod middleware;
mod routes;

use anyhow::Result;
use axum::{
    extract::Request,
    http::{request::Parts, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::{Config, MalformedBodyPolicy};
use crate::db::Database;

pub struct AppState {
    pub db: Database,
    pub auth_token: String,
    pub malformed_body: MalformedBodyPolicy,
}

impl AppState {
    pub fn new(config: &Config, db: Database) -> Self {
        Self {
            db,
            auth_token: config.auth.token.clone(),
            malformed_body: config.ingest.malformed_body,
        }
    }
}

pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let stats = Router::new()
        .route("/stats", post(routes::add_stats))
        .route("/stats/raw", get(routes::raw_stats))
        .route("/stats/count_by_day", get(routes::count_by_day))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth_token));

    Router::new()
        .route("/ping", get(routes::ping))
        .merge(stats)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CatchPanicLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(cors_layer()),
        )
}

/// Browsers on any http(s) origin may call the API
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _: &Parts| {
            let origin = origin.as_bytes();
            origin.starts_with(b"https://") || origin.starts_with(b"http://")
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(300))
}

pub async fn start_server(config: &Config, db: Database) -> Result<()> {
    let state = Arc::new(AppState::new(config, db));
    let app = create_router(state, config.request_timeout());

    let addr = config.bind_addr();
    info!("Web server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
