//! Push-based entry point: GitHub webhook deliveries.
//!
//! # Endpoints
//!
//! - `POST /webhook` verifies the delivery signature and processes `release`
//!   events before responding. Any failure is a 500; everything else is a 200.
//! - `GET /health` returns 200 while the listener is up.

mod response;
mod signature;

pub use response::ApiError;
pub use signature::{parse_signature_header, sign, verify_signature};

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::release::ReleaseProcessor;
use crate::types::ReleaseEvent;

pub const EVENT_HEADER: &str = "x-github-event";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

pub struct WebhookState {
    pub processor: Arc<ReleaseProcessor>,
    /// Shared secret for delivery signatures.
    pub secret: Vec<u8>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<StatusCode, ApiError> {
    let signature = header(&headers, SIGNATURE_HEADER).ok_or(Error::Unauthorized)?;
    if !verify_signature(&body, signature, &state.secret) {
        return Err(Error::Unauthorized.into());
    }

    let kind = header(&headers, EVENT_HEADER)
        .ok_or_else(|| Error::BadRequest(format!("missing {EVENT_HEADER} header")))?;

    match kind {
        "release" => {
            if let Some(event) = ReleaseEvent::from_webhook(&body)? {
                state.processor.process(&event).await?;
            }
        }
        "ping" => debug!("webhook ping"),
        other => debug!(event = other, "ignoring webhook event"),
    }

    Ok(StatusCode::OK)
}

pub fn create_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(handle_webhook))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serves the webhook router on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: Arc<WebhookState>,
    cancel: CancellationToken,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "listening for webhooks");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}
