use std::sync::Arc;

use {
    axum::{
        Json,
        extract::{Path, Query, State},
        http::header,
        response::IntoResponse,
    },
    chatlay_channel::PollBatch,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{error::ApiError, state::GatewayState};

#[derive(Debug, Default, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub token: String,
}

/// Body of `GET /{route}/poll.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    #[serde(flatten)]
    pub batch: PollBatch,
    pub enable_gigantified_emotes: bool,
}

/// Long-poll: held open until the route has events after `token`.
pub async fn poll_handler(
    State(state): State<Arc<GatewayState>>,
    Path(route): Path<String>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = state.channel(&route).await?;
    let Some(batch) = channel.poll(&query.token).await else {
        debug!(route = %route, "poll ended by route shutdown");
        return Err(ApiError::RouteStopped(route));
    };
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(PollResponse {
            batch,
            enable_gigantified_emotes: state.gigantified_emotes_enabled(),
        }),
    ))
}
