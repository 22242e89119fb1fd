// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The credentials plugin contract.
//!
//! A plugin inspects one request and reports exactly one [`AuthOutcome`]:
//!
//! - `Success` when it recognised and validated credentials,
//! - `Failure` when it recognised credentials that are not valid,
//! - `Pass` when the request carries nothing it recognises,
//! - `InProgress` (redirecting plugins) after writing its own response
//!   through [`AuthRequest::redirect`] or [`AuthRequest::respond`].

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::OriginalUri,
    http::{
        header::LOCATION, request::Parts, Extensions, HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use super::cache::TokenCache;
use super::error::CredentialsError;
use super::outcome::AuthOutcome;
use super::session::SessionHandle;
use crate::config::CredentialsOptions;

/// An authentication method (Basic, bearer token, OAuth login flow, ...).
#[async_trait]
pub trait CredentialsPlugin: Send + Sync {
    /// Stable name, used as the provider of produced profiles and as the
    /// lookup key of redirecting plugins.
    fn name(&self) -> &str;

    /// Redirecting plugins send unauthenticated browsers to a login flow
    /// instead of rejecting the request. Must not change after registration.
    fn redirecting(&self) -> bool {
        false
    }

    /// How long a validated token stays in this plugin's cache. `None`
    /// keeps entries until they are evicted.
    fn token_time_to_live(&self) -> Option<Duration> {
        None
    }

    /// Try to authenticate the request.
    async fn authenticate(
        &self,
        request: &mut AuthRequest<'_>,
        options: &CredentialsOptions,
    ) -> AuthOutcome;
}

/// Build a `303 See Other` redirect.
///
/// Fails instead of panicking when `location` is not a valid header value.
pub fn redirect_response(location: &str) -> Result<Response, CredentialsError> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| CredentialsError::InvalidRedirect(location.to_string()))?;
    Ok((StatusCode::SEE_OTHER, [(LOCATION, value)]).into_response())
}

/// What a plugin sees of one request.
pub struct AuthRequest<'a> {
    parts: &'a Parts,
    session: Option<SessionHandle>,
    cache: Option<&'a TokenCache>,
    cancellation: CancellationToken,
    response: Option<Response>,
}

impl<'a> AuthRequest<'a> {
    /// Wrap request parts.
    ///
    /// The session and cancellation token are taken from the extensions when
    /// the host provided them.
    pub fn new(parts: &'a Parts) -> Self {
        Self {
            parts,
            session: parts.extensions.get::<SessionHandle>().cloned(),
            cache: None,
            cancellation: parts
                .extensions
                .get::<CancellationToken>()
                .cloned()
                .unwrap_or_default(),
            response: None,
        }
    }

    /// Give the plugin access to its cache.
    pub fn with_cache(mut self, cache: &'a TokenCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// A header as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// The URI the client asked for, before any router nesting stripped a
    /// prefix.
    pub fn original_uri(&self) -> &Uri {
        self.parts
            .extensions
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri)
            .unwrap_or(&self.parts.uri)
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// The plugin's token cache. Only non-redirecting plugins get one.
    pub fn cache(&self) -> Option<&TokenCache> {
        self.cache
    }

    /// Cancelled when the client goes away, if the host wires that up.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Write a redirect as this plugin's response. Report
    /// [`AuthOutcome::InProgress`] afterwards.
    pub fn redirect(&mut self, location: &str) -> Result<(), CredentialsError> {
        self.response = Some(redirect_response(location)?);
        Ok(())
    }

    /// Write an arbitrary response. Report [`AuthOutcome::InProgress`]
    /// afterwards.
    pub fn respond(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
