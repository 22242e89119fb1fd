// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Apply it to the routes that need an authenticated caller:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/v1/me", get(me))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         credentials.clone(),
//!         credentials_middleware,
//!     ));
//! ```
//!
//! On success the [`UserProfile`](super::UserProfile) is available as a
//! request extension and through the [`Authenticated`](super::Authenticated)
//! extractor.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::credentials::Credentials;

/// Authentication middleware function.
pub async fn credentials_middleware(
    State(credentials): State<Arc<Credentials>>,
    request: Request,
    next: Next,
) -> Response {
    credentials.handle(request, next).await
}
