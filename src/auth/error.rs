// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::outcome::ResponseHints;

/// Errors surfaced to the host by the credentials pipeline.
///
/// Everything except [`CredentialsError::Rejected`] answers 401: internal
/// problems are logged where they happen and the caller only learns that it
/// is not authenticated.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No plugin authenticated the request
    #[error("Authentication is required")]
    Unauthorized,
    /// A plugin rejected the credentials, or every plugin passed
    #[error("Authentication failed")]
    Rejected(ResponseHints),
    /// A profile was built with missing mandatory fields
    #[error("Invalid user profile: {0}")]
    InvalidProfile(&'static str),
    /// No redirecting plugin is registered under this name
    #[error("Unknown credentials type: {0}")]
    UnknownCredentialsType(String),
    /// A login flow completed but there is no session to record it in
    #[error("Session is not available")]
    SessionUnavailable,
    /// The redirect location is not a valid header value
    #[error("Invalid redirect location: {0}")]
    InvalidRedirect(String),
    /// Internal error
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct CredentialsErrorBody {
    error: String,
    error_code: String,
}

impl CredentialsError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CredentialsError::Unauthorized => "unauthorized",
            CredentialsError::Rejected(_) => "authentication_failed",
            CredentialsError::InvalidProfile(_) => "invalid_profile",
            CredentialsError::UnknownCredentialsType(_) => "unknown_credentials_type",
            CredentialsError::SessionUnavailable => "session_unavailable",
            CredentialsError::InvalidRedirect(_) => "invalid_redirect",
            CredentialsError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CredentialsError::Rejected(hints) => hints.status_or_unauthorized(),
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for CredentialsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(CredentialsErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if let CredentialsError::Rejected(hints) = self {
            let headers = response.headers_mut();
            for (name, value) in hints.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{header::WWW_AUTHENTICATE, HeaderValue};

    #[tokio::test]
    async fn unauthorized_returns_401_with_code() {
        let response = CredentialsError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[test]
    fn rejected_uses_hinted_status_and_headers() {
        let hints = ResponseHints::status(StatusCode::BAD_REQUEST).with_header(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"Users\""),
        );
        let response = CredentialsError::Rejected(hints).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Users\""
        );
    }

    #[test]
    fn rejected_without_status_is_401() {
        let response = CredentialsError::Rejected(ResponseHints::default()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_answer_401() {
        let response = CredentialsError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            CredentialsError::InvalidRedirect("\n".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
