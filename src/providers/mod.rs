// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ready-made credentials plugins.
//!
//! - [`HttpBasicPlugin`] - `Authorization: Basic` against a user table
//! - [`StaticTokenPlugin`] - `Authorization: Bearer` against a token table,
//!   validated through the plugin's token cache

use axum::http::{header::AUTHORIZATION, HeaderMap};

pub mod basic;
pub mod static_token;

pub use basic::HttpBasicPlugin;
pub use static_token::StaticTokenPlugin;

/// Credentials following `scheme` in the `Authorization` header.
///
/// The scheme is matched case-insensitively.
pub(crate) fn authorization_credentials<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (given, credentials) = value.split_once(' ')?;
    given
        .eq_ignore_ascii_case(scheme)
        .then(|| credentials.trim_start())
}
