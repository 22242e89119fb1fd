// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for the auth tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{request::Parts, Request};

use super::cache::TokenFailure;
use super::outcome::AuthOutcome;
use super::plugin::{AuthRequest, CredentialsPlugin};
use super::UserProfile;
use crate::config::CredentialsOptions;

/// Request parts for `uri` with the given headers.
pub(crate) fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(()).unwrap().into_parts().0
}

/// Token plugin: `X-token-type: DummyToken` plus `access_token: dummyToken123`.
#[derive(Default)]
pub(crate) struct DummyTokenPlugin {
    pub generated: AtomicUsize,
}

pub(crate) const DUMMY_TOKEN: &str = "dummyToken123";

#[async_trait]
impl CredentialsPlugin for DummyTokenPlugin {
    fn name(&self) -> &str {
        "DummyToken"
    }

    async fn authenticate(
        &self,
        request: &mut AuthRequest<'_>,
        _options: &CredentialsOptions,
    ) -> AuthOutcome {
        if request.header("X-token-type") != Some(self.name()) {
            return AuthOutcome::pass();
        }
        let Some(token) = request.header("access_token") else {
            return AuthOutcome::failure();
        };
        let Some(cache) = request.cache() else {
            return AuthOutcome::failure();
        };

        let result = cache
            .get_or_generate(token, |token| async move {
                self.generated.fetch_add(1, Ordering::SeqCst);
                if token == DUMMY_TOKEN {
                    UserProfile::new("123", "Dummy User", "DummyToken")
                        .map_err(TokenFailure::from_error)
                } else {
                    Err(TokenFailure::Rejected(Default::default()))
                }
            })
            .await;
        AuthOutcome::from_token_result(result)
    }
}

/// Plugin that always reports the same outcome and counts its calls.
pub(crate) struct ScriptedPlugin {
    name: String,
    outcome: AuthOutcome,
    redirecting: bool,
    calls: AtomicUsize,
}

impl ScriptedPlugin {
    pub fn new(name: &str, outcome: AuthOutcome) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcome,
            redirecting: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn new_redirecting(name: &str, outcome: AuthOutcome) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcome,
            redirecting: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialsPlugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn redirecting(&self) -> bool {
        self.redirecting
    }

    async fn authenticate(
        &self,
        _request: &mut AuthRequest<'_>,
        _options: &CredentialsOptions,
    ) -> AuthOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Redirecting plugin imitating an OAuth round trip: without `code` it
/// sends the browser to `/login/callback?code=123`, with `code=123` it
/// succeeds.
pub(crate) struct DummySessionPlugin;

#[async_trait]
impl CredentialsPlugin for DummySessionPlugin {
    fn name(&self) -> &str {
        "DummySession"
    }

    fn redirecting(&self) -> bool {
        true
    }

    async fn authenticate(
        &self,
        request: &mut AuthRequest<'_>,
        _options: &CredentialsOptions,
    ) -> AuthOutcome {
        match request.query_param("code").as_deref() {
            Some("123") => match UserProfile::new("dummy123", "Dummy Session User", self.name()) {
                Ok(profile) => AuthOutcome::Success(profile),
                Err(_) => AuthOutcome::failure(),
            },
            Some(_) => AuthOutcome::failure(),
            None => match request.redirect("/login/callback?code=123") {
                Ok(()) => AuthOutcome::InProgress,
                Err(_) => AuthOutcome::failure(),
            },
        }
    }
}
