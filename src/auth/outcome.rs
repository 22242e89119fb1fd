// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outcome reported by a credentials plugin for one request.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use super::UserProfile;

/// Advisory status and headers attached to a failure or a pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHints {
    /// Status to respond with (unauthorized when absent)
    pub status: Option<StatusCode>,
    /// Headers to merge into the response, e.g. `WWW-Authenticate`
    pub headers: HeaderMap,
}

impl ResponseHints {
    /// Hints carrying only a status.
    pub fn status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            headers: HeaderMap::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Status to respond with.
    pub fn status_or_unauthorized(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::UNAUTHORIZED)
    }

    /// True when neither a status nor any header was given.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.headers.is_empty()
    }
}

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The request carries valid credentials.
    Success(UserProfile),
    /// Credentials were recognised but rejected. Ends the chain.
    Failure(ResponseHints),
    /// No credential material this plugin recognises. The next plugin is tried.
    Pass(ResponseHints),
    /// A redirecting plugin has already written its response (usually a
    /// redirect to the identity provider).
    InProgress,
}

impl AuthOutcome {
    /// Failure with no hints (responds 401).
    pub fn failure() -> Self {
        Self::Failure(ResponseHints::default())
    }

    /// Pass with no hints.
    pub fn pass() -> Self {
        Self::Pass(ResponseHints::default())
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
            Self::Pass(_) => "pass",
            Self::InProgress => "in_progress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::WWW_AUTHENTICATE;

    #[test]
    fn default_hints_are_empty_and_unauthorized() {
        let hints = ResponseHints::default();
        assert!(hints.is_empty());
        assert_eq!(hints.status_or_unauthorized(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn headers_make_hints_non_empty() {
        let hints = ResponseHints::default()
            .with_header(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        assert!(!hints.is_empty());
        assert_eq!(hints.status_or_unauthorized(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn explicit_status_wins() {
        let hints = ResponseHints::status(StatusCode::BAD_REQUEST);
        assert_eq!(hints.status_or_unauthorized(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(AuthOutcome::failure().kind(), "failure");
        assert_eq!(AuthOutcome::pass().kind(), "pass");
        assert_eq!(AuthOutcome::InProgress.kind(), "in_progress");
    }
}
