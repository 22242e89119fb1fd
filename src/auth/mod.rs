// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Pluggable request authentication: an ordered chain of credentials plugins
//! decides who is calling, with browser login flows on the side.
//!
//! ## Auth Flow
//!
//! 1. [`session_middleware`] attaches the caller's session (optional)
//! 2. [`credentials_middleware`] runs [`Credentials::handle`]:
//!    - a profile already on the request or in the session is reused
//!    - otherwise each non-redirecting plugin is tried in order
//!    - success attaches a [`UserProfile`] extension
//! 3. Handlers read it with the [`Authenticated`] extractor
//! 4. Callers with a session and no credentials are redirected to the login
//!    route served by a [`LoginHandler`]
//!
//! ## Caching
//!
//! Every non-redirecting plugin gets its own [`TokenCache`], so expensive
//! token verification runs once per token and TTL window.

pub mod cache;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod outcome;
pub mod plugin;
pub mod profile;
pub mod redirect;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{TokenCache, TokenFailure};
pub use credentials::{Credentials, Resolution};
pub use error::CredentialsError;
pub use extractor::{Authenticated, AuthenticatedUser, MaybeAuthenticated};
pub use middleware::credentials_middleware;
pub use outcome::{AuthOutcome, ResponseHints};
pub use plugin::{AuthRequest, CredentialsPlugin};
pub use profile::{DefaultProfileDelegate, ProfileDelegate, SessionProfile, UserProfile};
pub use redirect::{LoginHandler, RedirectCoordinator};
pub use session::{log_out, session_middleware, MemorySession, Session, SessionHandle, SessionStore};
