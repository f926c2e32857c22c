#[cfg(test)]
mod tests {
    use crate::helpers::app::{session_today, token_for, user};
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};
    use db::models::user::{Model as UserModel, UserRole};
    use serde_json::{Value, json};

    async fn enroll(
        app: &tower::util::BoxCloneService<
            axum::http::Request<axum::body::Body>,
            axum::response::Response,
            std::convert::Infallible,
        >,
        session_id: i64,
        member: &UserModel,
    ) {
        let (status, _) = send(
            app,
            Method::POST,
            &format!("/api/sessions/{session_id}/enrollments"),
            Some(&token_for(member)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn trainer_issue_is_idempotent() {
        let (app, state) = make_test_app().await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 10).await;
        let uri = format!("/api/sessions/{}/tokens", session.id);

        let (status, first) =
            send(&app, Method::POST, &uri, Some(&token_for(&trainer)), Some(json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["data"]["value"].as_str().unwrap().len(), 64);
        assert_eq!(first["data"]["session_type"], "both");
        assert_eq!(first["data"]["max_usage"], 20);
        assert_eq!(first["data"]["usage_count"], 0);

        let (_, second) =
            send(&app, Method::POST, &uri, Some(&token_for(&trainer)), Some(json!({}))).await;
        assert_eq!(first["data"]["value"], second["data"]["value"]);
    }

    #[tokio::test]
    async fn members_cannot_issue() {
        let (app, state) = make_test_app().await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let member = user(state.db(), "member", UserRole::Member).await;
        let session = session_today(state.db(), trainer.id, 10).await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&member)),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn oversized_ttl_is_rejected() {
        let (app, state) = make_test_app().await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 10).await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&trainer)),
            Some(json!({ "ttl_seconds": 10 * 24 * 3600 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn revoke_then_scan_is_not_found() {
        let (app, state) = make_test_app().await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let member = user(state.db(), "member", UserRole::Member).await;
        let session = session_today(state.db(), trainer.id, 10).await;
        enroll(&app, session.id, &member).await;
        let uri = format!("/api/sessions/{}/tokens", session.id);

        let (_, issued) =
            send(&app, Method::POST, &uri, Some(&token_for(&trainer)), Some(json!({}))).await;
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token_for(&trainer)), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token_for(&trainer)), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(json!({ "token": issued["data"]["value"], "kind": "check_in" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scan_flow() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let stranger = user(db, "stranger", UserRole::Member).await;
        let session = session_today(db, trainer.id, 10).await;
        enroll(&app, session.id, &member).await;

        let (_, issued) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&trainer)),
            Some(json!({ "ttl_seconds": 600 })),
        )
        .await;
        let value = issued["data"]["value"].clone();
        let scan = |kind: &str| json!({ "token": value, "kind": kind, "location": "front desk" });

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(scan("check_in")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["member_id"], member.id);
        assert_eq!(json["data"]["session_id"], session.id);
        assert!(json["data"]["check_in_at"].is_string());
        assert_eq!(json["data"]["check_in_location"], "front desk");
        assert!(matches!(
            json["data"]["status"].as_str(),
            Some("present") | Some("late")
        ));

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(scan("check_in")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["reason"], "duplicate_scan");

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&stranger)),
            Some(scan("check_in")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["reason"], "not_enrolled");

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(scan("check_out")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"]["check_out_at"].is_string());
        assert!(json["data"]["duration_attended"].is_number());
    }

    #[tokio::test]
    async fn usage_ceiling_is_reported_with_counts() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 10).await;
        let first = user(db, "first", UserRole::Member).await;
        let second = user(db, "second", UserRole::Member).await;
        enroll(&app, session.id, &first).await;
        enroll(&app, session.id, &second).await;

        let (_, issued) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&trainer)),
            Some(json!({ "session_type": "check_in", "max_usage": 1 })),
        )
        .await;
        let body: Value = json!({ "token": issued["data"]["value"], "kind": "check_in" });

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&first)),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&second)),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["usage_count"], 1);
        assert_eq!(json["data"]["max_usage"], 1);
    }

    #[tokio::test]
    async fn check_in_token_refuses_check_out() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 10).await;
        enroll(&app, session.id, &member).await;

        let (_, issued) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&trainer)),
            Some(json!({ "session_type": "check_in" })),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(json!({ "token": issued["data"]["value"], "kind": "check_out" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
