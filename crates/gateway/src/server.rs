use std::{future::Future, net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        extract::{Path, State},
        response::{IntoResponse, Redirect},
        routing::{delete, get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{api, error::ApiError, poll::poll_handler, state::GatewayState};

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/{route}/api/messages", post(api::post_message))
        .route("/{route}/api/messages/{message_id}", delete(api::delete_message))
        .route(
            "/{route}/api/messages/{message_id}/gigantify",
            post(api::mark_gigantified),
        )
        .route("/{route}/api/clear", post(api::clear))
        .route(
            "/{route}/api/users/{username}/messages",
            delete(api::delete_user_messages),
        )
        .route("/{route}/api/gigantify", post(api::gigantify));

    Router::new()
        .route("/health", get(health_handler))
        .route("/{route}", get(index_redirect))
        .route("/{route}/", get(index_redirect))
        .route("/{route}/poll.json", get(poll_handler))
        .route("/{route}/{file}", get(asset_handler))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Serve the overlays until `shutdown` resolves. Routes must already be
/// started on `state.registry`.
pub async fn serve<F>(
    state: Arc<GatewayState>,
    bind: &str,
    port: u16,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let routes = state.registry.route_keys().await;
    let overrides = state
        .assets
        .override_dir()
        .await
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "built-in".into());
    let lines = [
        format!("chatlay gateway v{}", state.version),
        format!("listening on http://{addr}"),
        format!("{} routes: {}", routes.len(), routes.join(", ")),
        format!("overlay files: {overrides}"),
        format!(
            "gigantified emotes: {}",
            if state.gigantified_emotes_enabled() {
                "on"
            } else {
                "off"
            }
        ),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("gateway stopped");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "routes": state.registry.route_keys().await,
        "pendingPolls": state.registry.pending_polls().await,
    }))
}

async fn index_redirect(
    State(state): State<Arc<GatewayState>>,
    Path(route): Path<String>,
) -> Result<Redirect, ApiError> {
    state.channel(&route).await?;
    Ok(Redirect::to(&format!("/{route}/index.html")))
}

async fn asset_handler(
    State(state): State<Arc<GatewayState>>,
    Path((route, file)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.channel(&route).await?;
    let asset = state
        .assets
        .resolve(&route, &file)
        .await
        .ok_or(ApiError::AssetNotFound(file))?;
    Ok(([("content-type", asset.content_type)], asset.body))
}
