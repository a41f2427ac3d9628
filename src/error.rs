use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::jwt::TokenError;

/// Error surface of the whole API.
///
/// Two collapses are deliberate and must stay: malformed and expired tokens
/// answer with the same 403, and "does not exist" vs "exists but not yours"
/// answer with the same 404, so callers learn nothing about other users'
/// listings. The internal variants stay distinct for logs and tests.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Access denied. No token provided.")]
    Unauthenticated,

    #[error("Invalid or expired token.")]
    InvalidToken(#[source] TokenError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Car not found or unauthorized")]
    NotFoundOrUnauthorized,

    #[error("{0}")]
    Validation(&'static str),

    #[error("{context}")]
    MediaStore {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}")]
    Internal {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn media(context: &'static str, source: anyhow::Error) -> Self {
        Self::MediaStore { context, source }
    }

    pub fn internal(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            context,
            source: source.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidToken(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::NotFoundOrUnauthorized => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MediaStore { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidToken(source) => warn!(reason = %source, "rejected bearer token"),
            ApiError::MediaStore { context, source } => {
                error!(error = ?source, "{context}")
            }
            ApiError::Internal { context, source } => {
                error!(error = ?source, "{context}")
            }
            _ => {}
        }
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
