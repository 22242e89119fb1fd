// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP Basic authentication against a static user table.
//!
//! | Request | Outcome |
//! |---------|---------|
//! | no `Authorization`, or another scheme | pass, 401 + `WWW-Authenticate: Basic` |
//! | undecodable credentials, or no `:` | failure, 400 |
//! | unknown user or wrong password | failure, 401 + `WWW-Authenticate: Basic` |
//! | matching user and password | success |

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::{
    header::WWW_AUTHENTICATE,
    HeaderValue, StatusCode,
};
use base64ct::{Base64, Encoding};
use tracing::{debug, warn};

use crate::auth::{AuthOutcome, AuthRequest, CredentialsPlugin, ResponseHints, UserProfile};
use crate::config::CredentialsOptions;

use super::authorization_credentials;

/// Provider name of profiles produced by this plugin.
pub const BASIC_PROVIDER: &str = "HTTPBasic";

const DEFAULT_REALM: &str = "Users";

pub struct HttpBasicPlugin {
    users: HashMap<String, String>,
    realm: String,
}

impl HttpBasicPlugin {
    /// Create the plugin from `(user, password)` pairs.
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
            realm: DEFAULT_REALM.to_string(),
        }
    }

    /// Set the realm announced in `WWW-Authenticate`.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    fn challenge(&self, status: StatusCode) -> ResponseHints {
        let hints = ResponseHints::status(status);
        match HeaderValue::from_str(&format!("Basic realm=\"{}\"", self.realm)) {
            Ok(value) => hints.with_header(WWW_AUTHENTICATE, value),
            Err(e) => {
                warn!(error = %e, realm = %self.realm, "invalid Basic realm");
                hints
            }
        }
    }
}

/// Split decoded `user:password` credentials.
fn decode_credentials(encoded: &str) -> Option<(String, String)> {
    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[async_trait]
impl CredentialsPlugin for HttpBasicPlugin {
    fn name(&self) -> &str {
        BASIC_PROVIDER
    }

    async fn authenticate(
        &self,
        request: &mut AuthRequest<'_>,
        _options: &CredentialsOptions,
    ) -> AuthOutcome {
        let Some(encoded) = authorization_credentials(request.headers(), "Basic") else {
            return AuthOutcome::Pass(self.challenge(StatusCode::UNAUTHORIZED));
        };

        let Some((user, password)) = decode_credentials(encoded) else {
            debug!("malformed Basic credentials");
            return AuthOutcome::Failure(ResponseHints::status(StatusCode::BAD_REQUEST));
        };

        if self.users.get(&user) != Some(&password) {
            debug!(user = %user, "Basic credentials rejected");
            return AuthOutcome::Failure(self.challenge(StatusCode::UNAUTHORIZED));
        }

        match UserProfile::new(user.clone(), user, BASIC_PROVIDER) {
            Ok(profile) => AuthOutcome::Success(profile),
            Err(e) => {
                debug!(error = %e, "cannot build Basic profile");
                AuthOutcome::Failure(self.challenge(StatusCode::UNAUTHORIZED))
            }
        }
    }
}
