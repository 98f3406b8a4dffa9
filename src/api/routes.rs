use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use super::AppState;
use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    routes,
};

/// CORS for the configured browser origins; unparsable origins are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Creates the application router with all routes and middleware
pub fn create_router(state: AppState, cors_origins: &[String], max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        // Outermost, so the trace span can read the request id
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method};
    use axum_test::TestServer;

    fn server(origins: &[String], max_upload_bytes: usize) -> TestServer {
        let app = create_router(AppState::in_memory("router-secret"), origins, max_upload_bytes);
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let server = server(&[], 1024);
        let response = server
            .get("/health")
            .add_header(
                header::HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("trace-me-1"),
            )
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("x-request-id"), "trace-me-1");
    }

    #[tokio::test]
    async fn test_request_id_is_generated_when_missing() {
        let response = server(&[], 1024).get("/health").await;
        assert!(!response.header("x-request-id").is_empty());
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_cors_headers() {
        let origins = vec!["http://localhost:5173".to_string()];
        let response = server(&origins, 1024)
            .method(Method::OPTIONS, "/api/reels/feed")
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .add_header(
                header::ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("GET"),
            )
            .await;

        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://localhost:5173"
        );
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            "true"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        use axum::{body::Body, http::Request};
        use tower::ServiceExt;

        let app = create_router(AppState::in_memory("router-secret"), &[], 1024);
        let response = app
            .oneshot(Request::builder().uri("/api/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let response = server(&[], 64)
            .post("/api/auth/login")
            .json(&serde_json::json!({
                "email": "someone@example.com",
                "password": "x".repeat(256),
            }))
            .await;

        response.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    }
}
