use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Every way an auth request can fail. The `Display` text is what the client sees.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please provide all required fields")]
    MissingFields,
    #[error("Only @{0} college email addresses are allowed")]
    InvalidEmailDomain(String),
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Error sending reset link")]
    MailDispatchFailure(#[source] anyhow::Error),
    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields
            | Self::InvalidEmailDomain(_)
            | Self::UserAlreadyExists
            | Self::InvalidCredentials
            | Self::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MailDispatchFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::MailDispatchFailure(e) | Self::Internal(e) => {
                error!(error = ?e, %status, "request failed");
            }
            other => warn!(%status, reason = %other, "request rejected"),
        }
        (status, Json(json!({ "msg": self.to_string() }))).into_response()
    }
}
