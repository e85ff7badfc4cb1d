//! Webhook receiver and liveness HTTP surface.
//!
//! In webhook mode one axum server carries both the Telegram update
//! endpoint (mounted by teloxide at the path of WEBHOOK_URL) and two
//! liveness routes: `/` with service info and `/ping` for the external
//! keep-alive pinger.

use std::net::SocketAddr;

use axum::{response::Json, routing::get, Router};
use serde_json::json;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tokio::net::TcpListener;

use crate::core::config;
use crate::telegram::handlers::HandlerError;
use crate::telegram::Bot;

/// GET / — basic service info.
async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "Loophole Project Tracker Bot",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/ping"
        }
    }))
}

/// GET /ping — liveness check with a timestamp.
async fn ping_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": crate::airtable::now_utc_iso(),
    }))
}

/// The liveness routes, mounted alongside the webhook endpoint.
pub fn health_router() -> Router {
    Router::new().route("/", get(root_handler)).route("/ping", get(ping_handler))
}

/// Runs the bot in webhook mode until shutdown.
///
/// Registers the webhook with Telegram, serves the update endpoint plus
/// the liveness routes on PORT, and dispatches updates through the
/// given handler tree.
pub async fn run_webhook(bot: Bot, handler: UpdateHandler<HandlerError>, webhook_url: &str) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], *config::PORT));
    let url = url::Url::parse(webhook_url)?;

    let (listener, stop_flag, bot_router) = webhooks::axum_to_router(bot.clone(), webhooks::Options::new(addr, url))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to register webhook: {}", e))?;

    let app = bot_router.merge(health_router());
    let tcp_listener = TcpListener::bind(&addr).await?;
    log::info!("Webhook server listening on http://{}", addr);
    log::info!("  /ping  - Liveness check");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp_listener, app).with_graceful_shutdown(stop_flag).await {
            log::error!("Webhook server error: {}", e);
        }
    });

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_ping_route() {
        let app = health_router();
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "ok");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_root_route_names_the_service() {
        let app = health_router();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["service"], "Loophole Project Tracker Bot");
        assert_eq!(value["endpoints"]["health"], "/ping");
    }
}
