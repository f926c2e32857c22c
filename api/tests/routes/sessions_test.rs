#[cfg(test)]
mod tests {
    use crate::helpers::app::{session_today, token_for, user};
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};
    use db::models::attendance_token::{Model as TokenModel, NewToken, TokenSessionType};
    use db::models::user::{Model as UserModel, UserRole};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn new_session_body(trainer_id: i64, capacity: i32) -> serde_json::Value {
        json!({
            "trainer_id": trainer_id,
            "title": "Morning spin",
            "location": "Studio B",
            "starts_on": "2025-03-10",
            "ends_on": "2025-03-31",
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "capacity": capacity,
        })
    }

    #[tokio::test]
    async fn admin_schedules_session() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&token_for(&admin)),
            Some(new_session_body(trainer.id, 12)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["trainer_id"], trainer.id);
        assert_eq!(json["data"]["capacity"], 12);
        assert_eq!(json["data"]["enrolled_count"], 0);
        assert_eq!(json["data"]["seats_left"], 12);
        assert_eq!(json["data"]["active"], true);
    }

    #[tokio::test]
    async fn members_cannot_schedule() {
        let (app, state) = make_test_app().await;
        let member = user(state.db(), "member", UserRole::Member).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&token_for(&member)),
            Some(new_session_body(trainer.id, 12)),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_rights_follow_the_stored_role() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let member = user(state.db(), "member", UserRole::Member).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;

        let (forged, _) = api::auth::generate_jwt(member.id, true);
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&forged),
            Some(new_session_body(trainer.id, 5)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (stale, _) = api::auth::generate_jwt(admin.id, false);
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&stale),
            Some(new_session_body(trainer.id, 5)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn deactivated_accounts_are_turned_away() {
        let (app, state) = make_test_app().await;
        let member = user(state.db(), "member", UserRole::Member).await;
        let token = token_for(&member);
        UserModel::set_active(state.db(), member.id, false).await.unwrap();

        let (status, json) =
            send(&app, Method::GET, "/api/me/enrollments", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Account is not active");
    }

    #[tokio::test]
    async fn zero_capacity_is_rejected() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&token_for(&admin)),
            Some(new_session_body(trainer.id, 0)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "capacity must be positive");
    }

    #[tokio::test]
    async fn trainer_must_be_staff() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let member = user(state.db(), "member", UserRole::Member).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/sessions",
            Some(&token_for(&admin)),
            Some(new_session_body(member.id, 5)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let (app, state) = make_test_app().await;
        let member = user(state.db(), "member", UserRole::Member).await;

        let (status, json) = send(
            &app,
            Method::GET,
            "/api/sessions/999",
            Some(&token_for(&member)),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn reschedule_and_resize() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 4).await;

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}", session.id),
            Some(&token_for(&admin)),
            Some(json!({ "title": "Evening spin", "capacity": 6 })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["session"]["title"], "Evening spin");
        assert_eq!(json["data"]["session"]["capacity"], 6);
        assert_eq!(json["data"]["promoted"], json!([]));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 4).await;

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}", session.id),
            Some(&token_for(&admin)),
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn shrinking_below_enrolled_is_a_conflict() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 3).await;

        for name in ["a", "b"] {
            let member = user(state.db(), name, UserRole::Member).await;
            let (status, _) = send(
                &app,
                Method::POST,
                &format!("/api/sessions/{}/enrollments", session.id),
                Some(&token_for(&member)),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}", session.id),
            Some(&token_for(&admin)),
            Some(json!({ "capacity": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["capacity"], 1);
        assert_eq!(json["data"]["enrolled_count"], 2);
    }

    #[tokio::test]
    async fn rejected_capacity_keeps_the_old_title() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 2).await;

        for name in ["a", "b"] {
            let member = user(state.db(), name, UserRole::Member).await;
            let (status, _) = send(
                &app,
                Method::POST,
                &format!("/api/sessions/{}/enrollments", session.id),
                Some(&token_for(&member)),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let uri = format!("/api/sessions/{}", session.id);
        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token_for(&admin)),
            Some(json!({ "title": "Renamed", "capacity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(&app, Method::GET, &uri, Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["title"], "Open gym");
        assert_eq!(json["data"]["capacity"], 2);
    }

    #[tokio::test]
    async fn closing_retires_token_and_is_not_repeatable() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;
        let trainer = user(state.db(), "trainer", UserRole::Trainer).await;
        let session = session_today(state.db(), trainer.id, 3).await;
        let token = TokenModel::create(
            state.db(),
            NewToken {
                session_id: session.id,
                issued_by: trainer.id,
                session_type: TokenSessionType::Both,
                expires_at: Utc::now() + Duration::minutes(15),
                max_usage: 6,
            },
        )
        .await
        .unwrap();

        let uri = format!("/api/sessions/{}", session.id);
        let (status, json) =
            send(&app, Method::DELETE, &uri, Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["active"], false);

        let stored = TokenModel::find_by_value(state.db(), &token.value)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.active);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::GONE);
    }
}
