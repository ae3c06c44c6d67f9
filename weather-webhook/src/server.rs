//! HTTP transport for the fulfillment webhook.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::Html,
    routing::{get, post},
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use weather_core::{Fulfillment, FulfillmentResponse};

const STATUS_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Weather Webhook</title></head>
  <body>
    <h1>Webhook is Online</h1>
    <p>POST agent requests to <code>/webhook</code>.</p>
  </body>
</html>
"#;

#[derive(Debug, Clone)]
pub struct AppState {
    pub fulfillment: Fulfillment,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status_handler))
        .route("/health", get(health_handler))
        .route("/webhook", post(webhook_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "webhook listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

async fn status_handler() -> Html<&'static str> {
    Html(STATUS_PAGE)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn webhook_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<FulfillmentResponse> {
    // Unparseable bodies still get an answer; the orchestrator treats null as malformed.
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|err| {
        tracing::warn!(error = %err, bytes = body.len(), "webhook body is not JSON");
        Value::Null
    });

    Json(state.fulfillment.handle(payload).await)
}
