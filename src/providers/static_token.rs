// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer tokens looked up in a static table.
//!
//! Stands in for a real token introspection endpoint: validation goes through
//! the plugin's [`TokenCache`](crate::auth::TokenCache), so a token is only
//! looked up again once its cache entry is older than the configured TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{
    header::WWW_AUTHENTICATE,
    HeaderValue, StatusCode,
};
use tracing::debug;

use crate::auth::{
    AuthOutcome, AuthRequest, CredentialsPlugin, ResponseHints, TokenFailure, UserProfile,
};
use crate::config::{CredentialsOptions, StaticTokenEntry};

use super::authorization_credentials;

/// Provider name of profiles produced by this plugin.
pub const STATIC_TOKEN_PROVIDER: &str = "StaticToken";

pub struct StaticTokenPlugin {
    /// token → (user id, display name)
    tokens: HashMap<String, (String, String)>,
    ttl: Option<Duration>,
}

impl StaticTokenPlugin {
    pub fn new(entries: impl IntoIterator<Item = StaticTokenEntry>) -> Self {
        Self {
            tokens: entries
                .into_iter()
                .map(|entry| (entry.token, (entry.user_id, entry.display_name)))
                .collect(),
            ttl: None,
        }
    }

    /// Expire cached tokens after `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn verify(&self, token: &str) -> Result<UserProfile, TokenFailure> {
        let (user_id, display_name) = self.tokens.get(token).ok_or_else(|| {
            TokenFailure::Rejected(ResponseHints::status(StatusCode::UNAUTHORIZED).with_header(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            ))
        })?;
        UserProfile::new(user_id.as_str(), display_name.as_str(), STATIC_TOKEN_PROVIDER)
            .map_err(TokenFailure::from_error)
    }
}

#[async_trait]
impl CredentialsPlugin for StaticTokenPlugin {
    fn name(&self) -> &str {
        STATIC_TOKEN_PROVIDER
    }

    fn token_time_to_live(&self) -> Option<Duration> {
        self.ttl
    }

    async fn authenticate(
        &self,
        request: &mut AuthRequest<'_>,
        _options: &CredentialsOptions,
    ) -> AuthOutcome {
        let Some(token) = authorization_credentials(request.headers(), "Bearer")
            .map(str::trim)
            .filter(|token| !token.is_empty())
        else {
            return AuthOutcome::pass();
        };

        let result = match request.cache() {
            Some(cache) => {
                cache
                    .get_or_generate(token, |token| async move {
                        debug!("verifying bearer token");
                        self.verify(&token)
                    })
                    .await
            }
            None => self.verify(token),
        };
        AuthOutcome::from_token_result(result)
    }
}
