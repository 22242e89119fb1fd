// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, option keys and the options map handed to
//! every credentials plugin.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `CREDENTIALS_FAILURE_REDIRECT` | Where unauthenticated browsers are sent | unset (401) |
//! | `CREDENTIALS_SUCCESS_REDIRECT` | Where browsers land after a login | unset |
//! | `CREDENTIALS_CACHE_CAPACITY` | Max cached tokens per plugin | `10000` |
//! | `CREDENTIALS_TOKEN_TTL_SECS` | TTL of cached tokens for the static token plugin | unset (no expiry) |
//! | `CREDENTIALS_STATIC_TOKENS` | `token=id:Display Name` entries, comma separated | empty |
//! | `CREDENTIALS_BASIC_USERS` | `user:password` entries, comma separated | empty |

use std::env;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::cache::DEFAULT_CACHE_CAPACITY;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const FAILURE_REDIRECT_ENV: &str = "CREDENTIALS_FAILURE_REDIRECT";
pub const SUCCESS_REDIRECT_ENV: &str = "CREDENTIALS_SUCCESS_REDIRECT";
pub const CACHE_CAPACITY_ENV: &str = "CREDENTIALS_CACHE_CAPACITY";
pub const TOKEN_TTL_SECS_ENV: &str = "CREDENTIALS_TOKEN_TTL_SECS";
pub const STATIC_TOKENS_ENV: &str = "CREDENTIALS_STATIC_TOKENS";
pub const BASIC_USERS_ENV: &str = "CREDENTIALS_BASIC_USERS";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Option key: where to send callers that must log in.
pub const FAILURE_REDIRECT: &str = "failureRedirect";
/// Option key: where to send callers after a successful login.
pub const SUCCESS_REDIRECT: &str = "successRedirect";
/// Option key: capacity of each plugin's token cache.
pub const CACHE_CAPACITY: &str = "cacheCapacity";

/// Options shared, read-only, by every plugin.
///
/// Plugins may read their own keys; the pipeline itself uses
/// [`FAILURE_REDIRECT`], [`SUCCESS_REDIRECT`] and [`CACHE_CAPACITY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsOptions(Map<String, Value>);

impl CredentialsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn failure_redirect(&self) -> Option<&str> {
        self.get_str(FAILURE_REDIRECT)
    }

    pub fn success_redirect(&self) -> Option<&str> {
        self.get_str(SUCCESS_REDIRECT)
    }

    /// Token cache capacity, falling back to the default.
    pub fn cache_capacity(&self) -> usize {
        self.0
            .get(CACHE_CAPACITY)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    /// Build options from the `CREDENTIALS_*` environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::new();
        if let Ok(path) = env::var(FAILURE_REDIRECT_ENV) {
            options = options.with(FAILURE_REDIRECT, path);
        }
        if let Ok(path) = env::var(SUCCESS_REDIRECT_ENV) {
            options = options.with(SUCCESS_REDIRECT, path);
        }
        if let Some(capacity) = env::var(CACHE_CAPACITY_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            options = options.with(CACHE_CAPACITY, capacity);
        }
        options
    }
}

/// One entry of [`STATIC_TOKENS_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTokenEntry {
    pub token: String,
    pub user_id: String,
    pub display_name: String,
}

/// Parse `token=id:Display Name,token2=id2` into entries.
///
/// Entries without a token or id are skipped; the display name defaults to
/// the id.
pub fn parse_static_tokens(raw: &str) -> Vec<StaticTokenEntry> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, rest) = entry.trim().split_once('=')?;
            let (user_id, display_name) = match rest.split_once(':') {
                Some((id, name)) => (id.trim(), name.trim()),
                None => (rest.trim(), rest.trim()),
            };
            if token.trim().is_empty() || user_id.is_empty() {
                return None;
            }
            Some(StaticTokenEntry {
                token: token.trim().to_string(),
                user_id: user_id.to_string(),
                display_name: display_name.to_string(),
            })
        })
        .collect()
}

/// Parse `user:password,user2:password2` into pairs.
pub fn parse_basic_users(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let (user, password) = entry.trim().split_once(':')?;
            (!user.is_empty()).then(|| (user.to_string(), password.to_string()))
        })
        .collect()
}
