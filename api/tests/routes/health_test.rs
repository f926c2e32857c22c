#[cfg(test)]
mod tests {
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = make_test_app().await;
        let (status, json) = send(&app, Method::GET, "/api/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn session_routes_require_a_token() {
        let (app, _) = make_test_app().await;
        let (status, json) = send(&app, Method::GET, "/api/sessions/1", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Authentication required");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (app, _) = make_test_app().await;
        let (status, _) =
            send(&app, Method::GET, "/api/me/enrollments", Some("not-a-jwt"), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
