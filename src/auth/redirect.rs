// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login redirects for browser flows.
//!
//! ## Flow
//!
//! 1. A protected route finds no credentials; the dispatcher stores the
//!    requested path under `returnTo` and redirects to `failureRedirect`.
//! 2. The login route ([`LoginHandler`]) runs one redirecting plugin, which
//!    usually redirects to an identity provider (`InProgress`).
//! 3. The provider calls back into the login route; the plugin succeeds, the
//!    profile is stored in the session and the browser goes back to
//!    `returnTo`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::Request,
    handler::Handler,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::credentials::Credentials;
use super::error::CredentialsError;
use super::outcome::AuthOutcome;
use super::plugin::{redirect_response, AuthRequest};
use super::profile::{ProfileDelegate, SessionProfile, UserProfile};
use super::session::{SessionHandle, RETURN_TO_KEY, USER_PROFILE_KEY};
use crate::config::CredentialsOptions;

/// Builds login and post-login responses from the options and session.
pub struct RedirectCoordinator<'a> {
    options: &'a CredentialsOptions,
    delegate: &'a dyn ProfileDelegate,
}

impl<'a> RedirectCoordinator<'a> {
    pub fn new(options: &'a CredentialsOptions, delegate: &'a dyn ProfileDelegate) -> Self {
        Self { options, delegate }
    }

    /// Send the caller to the login page.
    ///
    /// `requested_path` is remembered under `returnTo` when a session is
    /// available. Without `failure_path` or a `failureRedirect` option the
    /// caller gets a 401.
    pub fn redirect_to_login(
        &self,
        session: Option<&SessionHandle>,
        requested_path: Option<&str>,
        failure_path: Option<&str>,
    ) -> Response {
        if let (Some(session), Some(path)) = (session, requested_path) {
            session.set(RETURN_TO_KEY, Value::String(path.to_string()));
        }

        match failure_path.or_else(|| self.options.failure_redirect()) {
            Some(target) => redirect_or_unauthorized(target),
            None => CredentialsError::Unauthorized.into_response(),
        }
    }

    /// Record a completed login and send the caller on.
    ///
    /// The stored `returnTo` wins over `success_path`, which wins over the
    /// `successRedirect` option. Without any target the session profile is
    /// returned as JSON.
    pub fn redirect_to_success(
        &self,
        session: &SessionHandle,
        provider: &str,
        profile: &UserProfile,
        success_path: Option<&str>,
    ) -> Response {
        let mut value = self.delegate.to_session_value(profile);
        if let Value::Object(map) = &mut value {
            map.insert("provider".to_string(), Value::String(provider.to_string()));
        }
        session.set(USER_PROFILE_KEY, value);
        debug!(user_id = %profile.id(), provider, "login completed");

        let return_to = session
            .remove(RETURN_TO_KEY)
            .and_then(|v| v.as_str().map(str::to_string));

        match return_to
            .as_deref()
            .or(success_path)
            .or_else(|| self.options.success_redirect())
        {
            Some(target) => redirect_or_unauthorized(target),
            None => {
                let mut stored = SessionProfile::from(profile);
                stored.provider = provider.to_string();
                Json(stored).into_response()
            }
        }
    }
}

fn redirect_or_unauthorized(target: &str) -> Response {
    redirect_response(target).unwrap_or_else(|e| {
        error!(error = %e, "failed to build redirect");
        CredentialsError::Unauthorized.into_response()
    })
}

/// Handler for a login route bound to one redirecting plugin.
///
/// Created by [`Credentials::authenticate`]; mount it on both the login
/// route and the provider callback route.
#[derive(Clone)]
pub struct LoginHandler {
    credentials: Arc<Credentials>,
    credentials_type: String,
    success_redirect: Option<String>,
    failure_redirect: Option<String>,
}

impl LoginHandler {
    pub(crate) fn new(
        credentials: Arc<Credentials>,
        credentials_type: String,
        success_redirect: Option<String>,
        failure_redirect: Option<String>,
    ) -> Self {
        Self {
            credentials,
            credentials_type,
            success_redirect,
            failure_redirect,
        }
    }

    pub fn credentials_type(&self) -> &str {
        &self.credentials_type
    }

    /// Run the plugin for this request.
    pub async fn handle(&self, request: Request) -> Response {
        let Some(plugin) = self.credentials.redirecting_plugin(&self.credentials_type) else {
            warn!(credentials_type = %self.credentials_type, "no redirecting plugin registered");
            return CredentialsError::UnknownCredentialsType(self.credentials_type.clone())
                .into_response();
        };

        let (parts, _body) = request.into_parts();
        let mut auth_request = AuthRequest::new(&parts);
        let outcome = plugin
            .authenticate(&mut auth_request, self.credentials.options())
            .await;
        debug!(
            plugin = plugin.name(),
            outcome = outcome.kind(),
            "login plugin finished"
        );

        let coordinator = self.credentials.coordinator();
        match outcome {
            AuthOutcome::Success(profile) => match auth_request.session() {
                Some(session) => coordinator.redirect_to_success(
                    session,
                    &self.credentials_type,
                    &profile,
                    self.success_redirect.as_deref(),
                ),
                None => {
                    warn!(plugin = plugin.name(), "login succeeded without a session");
                    CredentialsError::SessionUnavailable.into_response()
                }
            },
            AuthOutcome::Failure(_) | AuthOutcome::Pass(_) => coordinator.redirect_to_login(
                auth_request.session(),
                None,
                self.failure_redirect.as_deref(),
            ),
            AuthOutcome::InProgress => auth_request.take_response().unwrap_or_else(|| {
                error!(
                    plugin = plugin.name(),
                    "plugin reported in progress without a response"
                );
                CredentialsError::Internal(format!(
                    "plugin {} reported in progress without a response",
                    plugin.name()
                ))
                .into_response()
            }),
        }
    }
}

impl<S> Handler<(), S> for LoginHandler
where
    S: Clone + Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, request: Request, _state: S) -> Self::Future {
        Box::pin(async move { self.handle(request).await })
    }
}
