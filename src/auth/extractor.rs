// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Authenticated` extractor behind [`credentials_middleware`]:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(user): Authenticated) -> impl IntoResponse {
//!     // user is a UserProfile
//! }
//! ```
//!
//! Handlers may ask for their own user type instead by implementing
//! [`AuthenticatedUser`].
//!
//! [`credentials_middleware`]: super::middleware::credentials_middleware

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::CredentialsError;
use super::profile::SessionProfile;
use super::UserProfile;

/// A user type built from the profile attached by the middleware.
pub trait AuthenticatedUser: Sized + Send {
    /// Convert the profile. Returning an error rejects the request.
    fn from_profile(profile: UserProfile) -> Result<Self, CredentialsError>;
}

impl AuthenticatedUser for UserProfile {
    fn from_profile(profile: UserProfile) -> Result<Self, CredentialsError> {
        Ok(profile)
    }
}

impl AuthenticatedUser for SessionProfile {
    fn from_profile(profile: UserProfile) -> Result<Self, CredentialsError> {
        Ok(SessionProfile::from(&profile))
    }
}

/// Extractor requiring an authenticated caller.
///
/// Rejects with 401 when no profile was attached to the request.
pub struct Authenticated<U = UserProfile>(pub U);

impl<S, U> FromRequestParts<S> for Authenticated<U>
where
    S: Send + Sync,
    U: AuthenticatedUser,
{
    type Rejection = CredentialsError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let profile = parts
            .extensions
            .get::<UserProfile>()
            .cloned()
            .ok_or(CredentialsError::Unauthorized)?;

        Ok(Authenticated(U::from_profile(profile)?))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct MaybeAuthenticated<U = UserProfile>(pub Option<U>);

impl<S, U> FromRequestParts<S> for MaybeAuthenticated<U>
where
    S: Send + Sync,
    U: AuthenticatedUser,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Authenticated::<U>::from_request_parts(parts, state).await {
            Ok(Authenticated(user)) => Ok(MaybeAuthenticated(Some(user))),
            Err(_) => Ok(MaybeAuthenticated(None)),
        }
    }
}
