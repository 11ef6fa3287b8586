use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderValue, Method, StatusCode, Uri, header::AUTHORIZATION, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::AppResult;

const PROXY_PREFIX: &str = "/jira-proxy";

pub fn router(ctx: Arc<AppContext>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_handler))
        .route(&format!("{PROXY_PREFIX}/{{*path}}"), get(proxy_handler))
        .route("/api/tickets", get(tickets_handler))
        .route("/api/tickets/refresh", post(refresh_handler))
        .route("/api/tickets/invalidate", post(invalidate_handler))
        .route("/api/tickets/status", get(status_handler));

    if let Some(dir) = &ctx.config.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(cors_layer(&ctx)).with_state(ctx)
}

pub async fn serve(ctx: Arc<AppContext>) -> AppResult<()> {
    if let Err(err) = ctx.tickets.initialize().await {
        warn!("Ticket feed disabled: {err}");
    }

    let app = router(ctx.clone());
    let address = format!("0.0.0.0:{}", ctx.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Dashboard server running on {address}");
    info!("Environment: {}", ctx.config.environment);
    info!("Health check: http://localhost:{}/health", ctx.config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ctx.tickets.shutdown().await;
    info!("Server shut down");
    Ok(())
}

fn cors_layer(ctx: &AppContext) -> CorsLayer {
    let origins = if ctx.config.is_production() {
        let allowed: Vec<HeaderValue> = ctx
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Ignoring invalid allowed origin {origin}: {err}");
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    } else {
        AllowOrigin::from(Any)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60))
}

async fn health_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": ctx.config.environment,
    }))
}

async fn proxy_handler(
    State(ctx): State<Arc<AppContext>>,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    // The still-encoded path is relayed as received.
    let path = uri
        .path()
        .strip_prefix(PROXY_PREFIX)
        .unwrap_or_else(|| uri.path());
    match ctx.gateway.forward(path, query.as_deref()).await {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(upstream.body)).into_response()
        }
        Err(err) => {
            warn!("Error in issue tracker proxy: {err}");
            err.into_response()
        }
    }
}

async fn tickets_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(ctx.tickets.get_tickets().await.as_ref().clone())
}

async fn refresh_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(ctx.tickets.refresh().await.as_ref().clone())
}

async fn invalidate_handler(State(ctx): State<Arc<AppContext>>) -> StatusCode {
    ctx.tickets.invalidate();
    StatusCode::NO_CONTENT
}

async fn status_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(ctx.tickets.status())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install terminate handler: {err}");
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
}
