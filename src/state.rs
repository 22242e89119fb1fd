// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::auth::{Credentials, SessionStore};
use crate::config::{
    parse_basic_users, parse_static_tokens, CredentialsOptions, BASIC_USERS_ENV,
    STATIC_TOKENS_ENV, TOKEN_TTL_SECS_ENV,
};
use crate::providers::{HttpBasicPlugin, StaticTokenPlugin};

#[derive(Clone)]
pub struct AppState {
    /// Registered plugins, shared by every request
    pub credentials: Arc<Credentials>,
    /// In-memory sessions keyed by cookie
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            sessions: SessionStore::new(),
        }
    }

    /// Build the plugin chain from the `CREDENTIALS_*` environment variables.
    ///
    /// Basic auth is registered before bearer tokens, so a request without
    /// credentials is answered with the Basic challenge.
    pub fn from_env() -> Self {
        let mut credentials = Credentials::new(CredentialsOptions::from_env());
        let mut registered = 0;

        let users = env::var(BASIC_USERS_ENV)
            .map(|raw| parse_basic_users(&raw))
            .unwrap_or_default();
        if !users.is_empty() {
            info!(users = users.len(), "enabling HTTP Basic authentication");
            credentials.register(HttpBasicPlugin::new(users));
            registered += 1;
        }

        let tokens = env::var(STATIC_TOKENS_ENV)
            .map(|raw| parse_static_tokens(&raw))
            .unwrap_or_default();
        if !tokens.is_empty() {
            info!(tokens = tokens.len(), "enabling static bearer tokens");
            let mut plugin = StaticTokenPlugin::new(tokens);
            if let Some(secs) = env::var(TOKEN_TTL_SECS_ENV)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
            {
                plugin = plugin.with_ttl(Duration::from_secs(secs));
            }
            credentials.register(plugin);
            registered += 1;
        }

        if registered == 0 {
            warn!("no credentials plugins configured, every protected request will be rejected");
        }

        Self::new(credentials)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Credentials::new(CredentialsOptions::new()))
    }
}
