use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    chatlay_channel::ChannelError,
    thiserror::Error,
    tracing::warn,
};

/// Failures surfaced to HTTP callers as `{ "error": "…" }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no overlay is running for route key {0:?}")]
    RouteNotFound(String),
    #[error("route {0:?} was stopped")]
    RouteStopped(String),
    #[error("static file not found: {0}")]
    AssetNotFound(String),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound(_) | Self::AssetNotFound(_) => StatusCode::NOT_FOUND,
            Self::RouteStopped(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Channel(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::Channel(_)) {
            warn!(error = %self, "rejected overlay action");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
