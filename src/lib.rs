// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Credentials - pluggable request authentication for Axum
//!
//! An ordered chain of credentials plugins decides who is calling. Token
//! plugins get a TTL cache; redirecting plugins drive browser login flows
//! backed by a session.
//!
//! ## Modules
//!
//! - `api` - Demo HTTP API (health, current user, logout, OpenAPI docs)
//! - `auth` - Plugin contract, dispatcher, cache, sessions and extractors
//! - `config` - Environment variables and plugin options
//! - `providers` - HTTP Basic and static bearer token plugins

pub mod api;
pub mod auth;
pub mod config;
pub mod providers;
pub mod state;
