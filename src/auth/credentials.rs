// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The plugin dispatcher.
//!
//! ## Chain rules
//!
//! Non-redirecting plugins run in registration order:
//!
//! - `Success` attaches the profile and stops,
//! - `Failure` stops and rejects with the plugin's status (401 by default),
//! - `Pass` records its hints if it is the first pass to carry a status,
//!   then moves on,
//! - `InProgress` stops and returns the response the plugin wrote.
//!
//! When every plugin passes, callers with a session are sent to the login
//! flow if a redirecting plugin is registered. Everyone else is rejected with
//! the first recorded pass hints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request},
    http::{request::Parts, Extensions},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, info};

use super::cache::TokenCache;
use super::error::CredentialsError;
use super::outcome::{AuthOutcome, ResponseHints};
use super::plugin::{AuthRequest, CredentialsPlugin};
use super::profile::{DefaultProfileDelegate, ProfileDelegate, UserProfile};
use super::redirect::{LoginHandler, RedirectCoordinator};
use super::session::{SessionHandle, USER_PROFILE_KEY};
use crate::config::CredentialsOptions;

/// A non-redirecting plugin together with its private cache.
struct Registered {
    plugin: Arc<dyn CredentialsPlugin>,
    cache: TokenCache,
}

/// How the chain resolved a request.
#[derive(Debug)]
pub enum Resolution {
    /// A plugin authenticated the caller.
    Authenticated(UserProfile),
    /// The request must be rejected with these hints.
    Rejected(ResponseHints),
    /// A response is ready (plugin redirect, or redirect to the login page).
    Responded(Response),
}

impl IntoResponse for Resolution {
    fn into_response(self) -> Response {
        match self {
            Resolution::Authenticated(profile) => Json(profile).into_response(),
            Resolution::Rejected(hints) => CredentialsError::Rejected(hints).into_response(),
            Resolution::Responded(response) => response,
        }
    }
}

/// Registered plugins and the options they share.
///
/// Register everything first, then wrap in an [`Arc`] and serve.
pub struct Credentials {
    non_redirecting: Vec<Registered>,
    redirecting: HashMap<String, Arc<dyn CredentialsPlugin>>,
    options: CredentialsOptions,
    delegate: Arc<dyn ProfileDelegate>,
}

impl Credentials {
    pub fn new(options: CredentialsOptions) -> Self {
        Self {
            non_redirecting: Vec::new(),
            redirecting: HashMap::new(),
            options,
            delegate: Arc::new(DefaultProfileDelegate),
        }
    }

    /// Replace the profile delegate used for sessions.
    pub fn with_delegate(mut self, delegate: Arc<dyn ProfileDelegate>) -> Self {
        self.delegate = delegate;
        self
    }

    /// Register a plugin.
    pub fn register(&mut self, plugin: impl CredentialsPlugin + 'static) -> &mut Self {
        self.register_arc(Arc::new(plugin))
    }

    /// Register a shared plugin.
    ///
    /// Redirecting plugins are keyed by name (a later registration replaces an
    /// earlier one); the others are appended to the chain with a fresh cache.
    pub fn register_arc(&mut self, plugin: Arc<dyn CredentialsPlugin>) -> &mut Self {
        let name = plugin.name().to_string();
        if plugin.redirecting() {
            info!(plugin = %name, "registered redirecting credentials plugin");
            self.redirecting.insert(name, plugin);
        } else {
            let cache =
                TokenCache::with_capacity(self.options.cache_capacity(), plugin.token_time_to_live());
            info!(
                plugin = %name,
                position = self.non_redirecting.len(),
                ttl_secs = plugin.token_time_to_live().map(|ttl| ttl.as_secs()),
                "registered credentials plugin"
            );
            self.non_redirecting.push(Registered { plugin, cache });
        }
        self
    }

    pub fn options(&self) -> &CredentialsOptions {
        &self.options
    }

    pub fn delegate(&self) -> &dyn ProfileDelegate {
        self.delegate.as_ref()
    }

    /// Look up a redirecting plugin by name.
    pub fn redirecting_plugin(&self, name: &str) -> Option<Arc<dyn CredentialsPlugin>> {
        self.redirecting.get(name).cloned()
    }

    /// The cache of a non-redirecting plugin.
    pub fn cache_for(&self, name: &str) -> Option<&TokenCache> {
        self.non_redirecting
            .iter()
            .find(|registered| registered.plugin.name() == name)
            .map(|registered| &registered.cache)
    }

    pub(crate) fn coordinator(&self) -> RedirectCoordinator<'_> {
        RedirectCoordinator::new(&self.options, self.delegate.as_ref())
    }

    /// Profile stored in the session by an earlier login, if any.
    pub fn restore_from_session(&self, extensions: &Extensions) -> Option<UserProfile> {
        let session = extensions.get::<SessionHandle>()?;
        let value = session.get(USER_PROFILE_KEY)?;
        let profile = self.delegate.from_session_value(&value);
        if profile.is_none() {
            debug!("ignoring unreadable session profile");
        }
        profile
    }

    /// Walk the chain of non-redirecting plugins for one request.
    pub async fn dispatch(&self, parts: &Parts) -> Resolution {
        let mut first_pass: Option<ResponseHints> = None;

        for (index, registered) in self.non_redirecting.iter().enumerate() {
            let plugin = &registered.plugin;
            let mut request = AuthRequest::new(parts).with_cache(&registered.cache);
            let outcome = plugin.authenticate(&mut request, &self.options).await;
            debug!(
                plugin = plugin.name(),
                index,
                outcome = outcome.kind(),
                "credentials plugin finished"
            );

            match outcome {
                AuthOutcome::Success(profile) => return Resolution::Authenticated(profile),
                AuthOutcome::Failure(hints) => return Resolution::Rejected(hints),
                AuthOutcome::Pass(hints) => {
                    if first_pass.is_none() && hints.status.is_some() {
                        first_pass = Some(hints);
                    }
                }
                AuthOutcome::InProgress => {
                    return match request.take_response() {
                        Some(response) => Resolution::Responded(response),
                        None => {
                            error!(
                                plugin = plugin.name(),
                                "plugin reported in progress without a response"
                            );
                            Resolution::Responded(
                                CredentialsError::Internal(format!(
                                    "plugin {} reported in progress without a response",
                                    plugin.name()
                                ))
                                .into_response(),
                            )
                        }
                    };
                }
            }
        }

        if !self.redirecting.is_empty() {
            if let Some(session) = parts.extensions.get::<SessionHandle>() {
                let requested = requested_path(parts);
                debug!(requested = %requested, "no credentials, redirecting to login");
                return Resolution::Responded(self.coordinator().redirect_to_login(
                    Some(session),
                    Some(&requested),
                    None,
                ));
            }
        }

        Resolution::Rejected(first_pass.unwrap_or_default())
    }

    /// Authenticate `request`, then hand it to `next` or answer it.
    ///
    /// Requests that already carry a [`UserProfile`] extension, or whose
    /// session holds one, skip the chain.
    pub async fn handle(&self, mut request: Request, next: Next) -> Response {
        if request.extensions().get::<UserProfile>().is_some() {
            return next.run(request).await;
        }

        if let Some(profile) = self.restore_from_session(request.extensions()) {
            debug!(user_id = %profile.id(), provider = %profile.provider(), "restored session profile");
            request.extensions_mut().insert(profile);
            return next.run(request).await;
        }

        let (mut parts, body) = request.into_parts();
        match self.dispatch(&parts).await {
            Resolution::Authenticated(profile) => {
                parts.extensions.insert(profile);
                next.run(Request::from_parts(parts, body)).await
            }
            other => other.into_response(),
        }
    }

    /// Handler running the redirecting plugin `credentials_type`.
    ///
    /// `success_redirect` and `failure_redirect` override the options for
    /// this route.
    pub fn authenticate(
        self: &Arc<Self>,
        credentials_type: &str,
        success_redirect: Option<&str>,
        failure_redirect: Option<&str>,
    ) -> LoginHandler {
        LoginHandler::new(
            Arc::clone(self),
            credentials_type.to_string(),
            success_redirect.map(str::to_string),
            failure_redirect.map(str::to_string),
        )
    }
}

/// Path and query the client asked for.
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
