// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        credentials_middleware,
        profile::{ProfileEmail, ProfileName, ProfilePhoto},
        session_middleware, UserProfile,
    },
    state::AppState,
};

pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/me", get(users::get_current_user))
        .route_layer(from_fn_with_state(
            state.credentials.clone(),
            credentials_middleware,
        ))
        .route("/logout", post(users::logout));

    Router::new()
        .route("/health/live", get(health::liveness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn_with_state(state.sessions.clone(), session_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(health::liveness, users::get_current_user, users::logout),
    components(
        schemas(
            health::HealthResponse,
            UserProfile,
            ProfileName,
            ProfileEmail,
            ProfilePhoto
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness probes"),
        (name = "Users", description = "Current user and logout")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "basic",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
        );
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        session::{SESSION_COOKIE, USER_PROFILE_KEY},
        Credentials, Session,
    };
    use crate::config::{parse_static_tokens, CredentialsOptions};
    use crate::providers::{HttpBasicPlugin, StaticTokenPlugin};
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, COOKIE, WWW_AUTHENTICATE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> AppState {
        let mut credentials = Credentials::new(CredentialsOptions::new());
        credentials.register(HttpBasicPlugin::new([(
            "John".to_string(),
            "123".to_string(),
        )]));
        credentials.register(StaticTokenPlugin::new(parse_static_tokens(
            "tok-alice=alice:Alice",
        )));
        AppState::new(credentials)
    }

    async fn send(app: &Router, method: &str, uri: &str, headers: &[(&str, &str)]) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        app.clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_is_public_and_has_request_id() {
        let app = router(state());
        let response = send(&app, "GET", "/health/live", &[]).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn stateless_requests_do_not_create_sessions() {
        let state = state();
        let sessions = state.sessions.clone();
        let app = router(state);

        for _ in 0..100 {
            send(&app, "GET", "/health/live", &[]).await;
        }
        send(&app, "GET", "/v1/me", &[(AUTHORIZATION.as_str(), "Bearer tok-alice")]).await;
        send(&app, "GET", "/v1/me", &[]).await;

        assert_eq!(sessions.len(), 0);
    }

    #[tokio::test]
    async fn me_without_credentials_gets_basic_challenge() {
        let app = router(state());
        let response = send(&app, "GET", "/v1/me", &[]).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Users\""
        );
    }

    #[tokio::test]
    async fn me_with_basic_credentials() {
        let app = router(state());
        // John:123
        let response = send(&app, "GET", "/v1/me", &[("Authorization", "Basic Sm9objoxMjM=")]).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], "John");
        assert_eq!(body["provider"], "HTTPBasic");
    }

    #[tokio::test]
    async fn me_with_bearer_token() {
        let app = router(state());
        let response = send(&app, "GET", "/v1/me", &[(AUTHORIZATION.as_str(), "Bearer tok-alice")]).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["id"], "alice");
        assert_eq!(body["displayName"], "Alice");
    }

    #[tokio::test]
    async fn unknown_bearer_token_is_rejected() {
        let app = router(state());
        let response = send(&app, "GET", "/v1/me", &[("Authorization", "Bearer nope")]).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Bearer error=\"invalid_token\""
        );
    }

    #[tokio::test]
    async fn logout_forgets_session_user() {
        let state = state();
        let (id, session) = state.sessions.create();
        session.set(
            USER_PROFILE_KEY,
            json!({"id": "7", "displayName": "Seven", "provider": "GitHub"}),
        );
        let cookie = format!("{SESSION_COOKIE}={id}");
        let app = router(state);

        let response = send(&app, "GET", "/v1/me", &[(COOKIE.as_str(), cookie.as_str())]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["provider"], "GitHub");

        let response = send(&app, "POST", "/v1/logout", &[(COOKIE.as_str(), cookie.as_str())]).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, "GET", "/v1/me", &[(COOKIE.as_str(), cookie.as_str())]).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn openapi_documents_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("basic"));
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(doc.paths.paths.contains_key("/v1/me"));
    }
}
