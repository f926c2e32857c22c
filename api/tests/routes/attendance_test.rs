#[cfg(test)]
mod tests {
    use crate::helpers::app::{session_today, token_for, user};
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, Utc};
    use db::models::user::UserRole;
    use serde_json::json;

    #[tokio::test]
    async fn excused_mark_survives_a_scan() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;
        let today = Utc::now().date_naive();

        send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/enrollments", session.id),
            Some(&token_for(&member)),
            None,
        )
        .await;

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
            Some(&token_for(&trainer)),
            Some(json!({ "date": today, "status": "excused", "notes": "Physio" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "excused");
        assert_eq!(json["data"]["manual_override"], true);
        assert_eq!(json["data"]["marked_by"], trainer.id);

        let (_, issued) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/tokens", session.id),
            Some(&token_for(&trainer)),
            Some(json!({})),
        )
        .await;
        let (status, json) = send(
            &app,
            Method::POST,
            "/api/attendance/scan",
            Some(&token_for(&member)),
            Some(json!({ "token": issued["data"]["value"], "kind": "check_in" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "excused");
        assert!(json["data"]["check_in_at"].is_string());
    }

    #[tokio::test]
    async fn members_cannot_mark() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
            Some(&token_for(&member)),
            Some(json!({ "date": Utc::now().date_naive(), "status": "present" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn marking_an_unscheduled_day_is_rejected() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;
        let tomorrow = Utc::now().date_naive() + Duration::days(1);

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
            Some(&token_for(&trainer)),
            Some(json!({ "date": tomorrow, "status": "present" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_notes_are_rejected() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
            Some(&token_for(&trainer)),
            Some(json!({
                "date": Utc::now().date_naive(),
                "status": "excused",
                "notes": "x".repeat(1001),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "notes must be at most 1000 characters");
    }

    #[tokio::test]
    async fn records_are_listed_for_staff() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let a = user(db, "a", UserRole::Member).await;
        let b = user(db, "b", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;
        let today = Utc::now().date_naive();

        for (member, status) in [(&a, "present"), (&b, "absent")] {
            send(
                &app,
                Method::PUT,
                &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
                Some(&token_for(&trainer)),
                Some(json!({ "date": today, "status": status })),
            )
            .await;
        }

        let uri = format!("/api/sessions/{}/attendance?date={today}", session.id);
        let (status, json) = send(&app, Method::GET, &uri, Some(&token_for(&trainer)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::GET, &uri, Some(&token_for(&a)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn stats_are_scoped_by_role() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let admin = user(db, "admin", UserRole::Admin).await;
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let other_trainer = user(db, "other", UserRole::Trainer).await;
        let a = user(db, "a", UserRole::Member).await;
        let b = user(db, "b", UserRole::Member).await;
        let mine = session_today(db, trainer.id, 5).await;
        let theirs = session_today(db, other_trainer.id, 5).await;
        let today = Utc::now().date_naive();

        let marks = [
            (&mine, &a, &trainer, "present"),
            (&mine, &b, &trainer, "absent"),
            (&theirs, &a, &other_trainer, "late"),
        ];
        for (session, member, marker, status) in marks {
            let (code, _) = send(
                &app,
                Method::PUT,
                &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
                Some(&token_for(marker)),
                Some(json!({ "date": today, "status": status })),
            )
            .await;
            assert_eq!(code, StatusCode::OK);
        }

        let (status, json) =
            send(&app, Method::GET, "/api/attendance/stats", Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 3);

        let (_, json) =
            send(&app, Method::GET, "/api/attendance/stats", Some(&token_for(&trainer)), None)
                .await;
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["present"], 1);
        assert_eq!(json["data"]["absent"], 1);
        assert_eq!(json["data"]["attendance_rate"], 0.5);

        let (_, json) =
            send(&app, Method::GET, "/api/attendance/stats", Some(&token_for(&a)), None).await;
        assert_eq!(json["data"]["total"], 2);
        assert_eq!(json["data"]["late"], 1);
        assert_eq!(json["data"]["attendance_rate"], 1.0);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/attendance/stats?member_id={}", b.id),
            Some(&token_for(&a)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let (app, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/attendance/stats?from=2025-03-10&to=2025-03-01",
            Some(&token_for(&admin)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
