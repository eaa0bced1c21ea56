//! Inbound mutation API: the host's chat triggers post here.

use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, State},
    },
    chatlay_channel::{ChannelError, ChatMessage, TriggerOutcome},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{error::ApiError, state::GatewayState};

type ApiResult = Result<Json<Value>, ApiError>;

fn success() -> ApiResult {
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GigantifyRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub cheer_message: String,
    #[serde(default)]
    pub emote_name: Option<String>,
}

pub async fn post_message(
    State(state): State<Arc<GatewayState>>,
    Path(route): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> ApiResult {
    let channel = state.channel(&route).await?;
    let message = body.message.ok_or(ChannelError::InvalidMessagePayload)?;
    channel.post(message, body.timestamp).await?;
    success()
}

pub async fn delete_message(
    State(state): State<Arc<GatewayState>>,
    Path((route, message_id)): Path<(String, String)>,
) -> ApiResult {
    state.channel(&route).await?.delete_message(&message_id).await;
    success()
}

pub async fn clear(
    State(state): State<Arc<GatewayState>>,
    Path(route): Path<String>,
) -> ApiResult {
    state.channel(&route).await?.clear().await;
    success()
}

pub async fn delete_user_messages(
    State(state): State<Arc<GatewayState>>,
    Path((route, username)): Path<(String, String)>,
) -> ApiResult {
    state
        .channel(&route)
        .await?
        .delete_messages_by_user(&username)
        .await?;
    success()
}

pub async fn mark_gigantified(
    State(state): State<Arc<GatewayState>>,
    Path((route, message_id)): Path<(String, String)>,
) -> ApiResult {
    state
        .channel(&route)
        .await?
        .mark_gigantified(&message_id)
        .await?;
    success()
}

/// An "emote enlarged" power-up for `(username, cheerMessage)`.
pub async fn gigantify(
    State(state): State<Arc<GatewayState>>,
    Path(route): Path<String>,
    Json(body): Json<GigantifyRequest>,
) -> ApiResult {
    let channel = state.channel(&route).await?;
    let outcome = channel
        .on_gigantify_trigger(&body.username, &body.cheer_message)
        .await?;
    debug!(
        route = %route,
        username = %body.username,
        emote = body.emote_name.as_deref().unwrap_or(""),
        matched = matches!(outcome, TriggerOutcome::Matched { .. }),
        "gigantify trigger received"
    );
    success()
}
