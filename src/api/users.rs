// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::Request, http::StatusCode, Json};

use crate::auth::{log_out, Authenticated, UserProfile};

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Users",
    security(("basic" = []), ("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized - missing or invalid credentials"),
    )
)]
pub async fn get_current_user(Authenticated(user): Authenticated) -> Json<UserProfile> {
    Json(user)
}

/// Forget the user stored in the session.
#[utoipa::path(
    post,
    path = "/v1/logout",
    tag = "Users",
    responses(
        (status = 204, description = "Logged out"),
    )
)]
pub async fn logout(mut request: Request) -> StatusCode {
    log_out(request.extensions_mut());
    StatusCode::NO_CONTENT
}
