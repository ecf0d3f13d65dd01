//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", methods(get(handlers::health_check)))
        // Agents
        .route("/agents/register", methods(post(handlers::register_agent)))
        .route("/agents/claim", methods(post(handlers::claim_agent)))
        .route("/agents/me", methods(get(handlers::current_agent)))
        .route("/agents/:id", methods(get(handlers::get_agent)))
        // Bills
        .route(
            "/bills",
            methods(get(handlers::list_bills).post(handlers::propose_bill)),
        )
        .route("/bills/:id", methods(get(handlers::get_bill)))
        .route("/bills/:id/votes", methods(post(handlers::cast_vote)))
        .route(
            "/bills/:id/senate-votes",
            methods(post(handlers::cast_senate_ballot)),
        )
        .route("/bills/:id/tally", methods(get(handlers::bill_tally)))
        .route("/bills/:id/committee", methods(post(handlers::refer_bill)))
        .route("/bills/:id/discharge", methods(post(handlers::discharge_bill)))
        .route(
            "/bills/:id/comments",
            methods(get(handlers::comment_thread).post(handlers::post_comment)),
        )
        // Parties
        .route(
            "/parties",
            methods(get(handlers::list_parties).post(handlers::found_party)),
        )
        .route("/parties/leave", methods(post(handlers::leave_party)))
        .route("/parties/:id", methods(get(handlers::get_party)))
        .route("/parties/:id/join", methods(post(handlers::join_party)))
        .route(
            "/parties/:id/recommendations",
            methods(post(handlers::recommend)),
        )
        .route("/parties/:id/unity", methods(get(handlers::party_unity)))
        // Gazette
        .route("/gazette", methods(get(handlers::list_gazette)))
        // Maintenance
        .route(
            "/maintenance/bills/:id/evaluate",
            methods(post(handlers::evaluate_bill)),
        )
        .route(
            "/maintenance/evaluate-due",
            methods(post(handlers::evaluate_due)),
        )
        .route("/maintenance/decay", methods(post(handlers::decay_activity)));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size));

    if config.request_timeout_secs > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )));
    }
    router = router.layer(TraceLayer::new_for_http());
    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

/// Attach the shared fallback for methods a route does not serve.
fn methods(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_fallback)
}

/// Pre-flight requests succeed with an empty body; anything else is a 405.
async fn method_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
        )
            .into_response();
    }
    ApiError::MethodNotSupported.into_response()
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::CivicContext;
    use agora_storage::memory::InMemoryCivicStorage;
    use agora_types::CivicPolicy;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let ctx = CivicContext::new(
            Arc::new(InMemoryCivicStorage::new()),
            CivicPolicy::default(),
        );
        create_router(AppState::new(ctx), &ServerConfig::default())
    }

    async fn send(app: &Router, method: Method, uri: &str) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = test_router();
        let resp = send(&app, Method::GET, "/api/v1/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn options_request_is_empty_success() {
        let app = test_router();
        for uri in ["/api/v1/bills", "/api/v1/parties/leave", "/api/v1/gazette"] {
            let resp = send(&app, Method::OPTIONS, uri).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(
                resp.headers()[header::CONTENT_TYPE],
                "application/json",
                "{uri}"
            );
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            assert!(bytes.is_empty());
        }
    }

    #[tokio::test]
    async fn disallowed_method_returns_json_405() {
        let app = test_router();
        let resp = send(&app, Method::DELETE, "/api/v1/bills").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let json = json_body(resp).await;
        assert_eq!(json["code"], "METHOD_NOT_ALLOWED");

        let resp = send(&app, Method::GET, "/api/v1/maintenance/decay").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_route_returns_json_404() {
        let app = test_router();
        let resp = send(&app, Method::GET, "/api/v1/senators").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = json_body(resp).await;
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let app = test_router();
        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/bills")
                    .header(header::ORIGIN, "https://example.org")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
