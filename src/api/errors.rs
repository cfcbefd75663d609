// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::crypto::CryptoError;
use crate::session::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// `error_type` for rejected envelopes (HMAC or AEAD failure)
pub const INVALID_ENVELOPE: &str = "invalid_envelope";
/// `error_type` telling the client to re-handshake
pub const UNKNOWN_SESSION: &str = "unknown_session";

/// Plaintext error body returned by every route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    /// HMAC mismatch on an incoming envelope
    Integrity,
    /// AEAD failure on an incoming envelope
    Decryption,
    UnknownSession(String),
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            // no hint about which check failed
            ApiError::Integrity | ApiError::Decryption => (
                INVALID_ENVELOPE,
                "Envelope could not be verified".to_string(),
                None,
            ),
            ApiError::UnknownSession(_) => (
                UNKNOWN_SESSION,
                "Unknown or expired session, handshake required".to_string(),
                None,
            ),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::Integrity
            | ApiError::Decryption => 400,
            ApiError::UnknownSession(_) => 401,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::Integrity => write!(f, "Envelope integrity check failed"),
            ApiError::Decryption => write!(f, "Envelope decryption failed"),
            ApiError::UnknownSession(id) => write!(f, "Unknown session: {}", id),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Integrity => ApiError::Integrity,
            CryptoError::Decryption { .. } => ApiError::Decryption,
            CryptoError::InvalidEnvelope { field, reason } => ApiError::ValidationError {
                field,
                message: reason,
            },
            CryptoError::InvalidKey { reason, .. } => ApiError::InvalidRequest(reason),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidPublicKey(reason) => {
                ApiError::InvalidRequest(format!("Invalid client public key: {}", reason))
            }
            SessionError::UnknownSession(id) => ApiError::UnknownSession(id),
            SessionError::StoreFull { .. } => {
                ApiError::ServiceUnavailable("Session capacity exhausted".to_string())
            }
            SessionError::Crypto(err) => ApiError::from(err),
            SessionError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// axum response wrapper for `ApiError`
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error_response = self.0.to_response();

        (status, Json(error_response)).into_response()
    }
}
