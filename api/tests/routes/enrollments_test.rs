#[cfg(test)]
mod tests {
    use crate::helpers::app::{session_today, token_for, user};
    use crate::helpers::{make_test_app, send};
    use axum::http::{Method, StatusCode};
    use db::models::user::UserRole;

    #[tokio::test]
    async fn full_session_waitlists_and_cancel_promotes() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 1).await;
        let first = user(db, "first", UserRole::Member).await;
        let second = user(db, "second", UserRole::Member).await;
        let uri = format!("/api/sessions/{}/enrollments", session.id);

        let (status, json) = send(&app, Method::POST, &uri, Some(&token_for(&first)), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["status"], "enrolled");
        assert_eq!(json["message"], "Enrolled");

        let (status, json) = send(&app, Method::POST, &uri, Some(&token_for(&second)), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["status"], "waitlisted");
        assert_eq!(json["data"]["position"], 1);

        let (status, json) = send(
            &app,
            Method::DELETE,
            &format!("{uri}/{}", first.id),
            Some(&token_for(&first)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["new_enrolled_count"], 1);
        assert_eq!(json["data"]["promoted"]["member_id"], second.id);
        assert_eq!(json["data"]["promoted"]["status"], "enrolled");
    }

    #[tokio::test]
    async fn enrolling_twice_is_a_conflict() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 5).await;
        let member = user(db, "member", UserRole::Member).await;
        let uri = format!("/api/sessions/{}/enrollments", session.id);

        send(&app, Method::POST, &uri, Some(&token_for(&member)), None).await;
        let (status, json) = send(&app, Method::POST, &uri, Some(&token_for(&member)), None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["reason"], "already_enrolled");
    }

    #[tokio::test]
    async fn only_admins_enroll_others() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let admin = user(db, "admin", UserRole::Admin).await;
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 5).await;
        let alice = user(db, "alice", UserRole::Member).await;
        let bob = user(db, "bob", UserRole::Member).await;
        let uri = format!("/api/sessions/{}/enrollments?member_id={}", session.id, bob.id);

        let (status, _) = send(&app, Method::POST, &uri, Some(&token_for(&alice)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = send(&app, Method::POST, &uri, Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["member_id"], bob.id);
    }

    #[tokio::test]
    async fn members_cannot_cancel_for_others() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 5).await;
        let alice = user(db, "alice", UserRole::Member).await;
        let bob = user(db, "bob", UserRole::Member).await;

        send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/enrollments", session.id),
            Some(&token_for(&bob)),
            None,
        )
        .await;

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/sessions/{}/enrollments/{}", session.id, bob.id),
            Some(&token_for(&alice)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn cancelling_without_a_place_is_a_conflict() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 5).await;
        let member = user(db, "member", UserRole::Member).await;

        let (status, json) = send(
            &app,
            Method::DELETE,
            &format!("/api/sessions/{}/enrollments/{}", session.id, member.id),
            Some(&token_for(&member)),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["data"]["reason"], "not_enrolled");
    }

    #[tokio::test]
    async fn closed_session_refuses_enrollment() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let admin = user(db, "admin", UserRole::Admin).await;
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 5).await;
        let member = user(db, "member", UserRole::Member).await;

        send(
            &app,
            Method::DELETE,
            &format!("/api/sessions/{}", session.id),
            Some(&token_for(&admin)),
            None,
        )
        .await;

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/enrollments", session.id),
            Some(&token_for(&member)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::GONE);
    }

    #[tokio::test]
    async fn roster_is_for_staff() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let other_trainer = user(db, "other", UserRole::Trainer).await;
        let session = session_today(db, trainer.id, 1).await;
        let a = user(db, "a", UserRole::Member).await;
        let b = user(db, "b", UserRole::Member).await;
        let uri = format!("/api/sessions/{}/enrollments", session.id);

        send(&app, Method::POST, &uri, Some(&token_for(&a)), None).await;
        send(&app, Method::POST, &uri, Some(&token_for(&b)), None).await;

        let (status, json) = send(&app, Method::GET, &uri, Some(&token_for(&trainer)), None).await;
        assert_eq!(status, StatusCode::OK);
        let roster = json["data"].as_array().unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0]["member_id"], a.id);
        assert_eq!(roster[0]["status"], "enrolled");
        assert_eq!(roster[1]["member_id"], b.id);
        assert_eq!(roster[1]["status"], "waitlisted");

        let (status, _) = send(&app, Method::GET, &uri, Some(&token_for(&a)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            send(&app, Method::GET, &uri, Some(&token_for(&other_trainer)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn member_sees_own_enrollments() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let yoga = session_today(db, trainer.id, 5).await;
        let spin = session_today(db, trainer.id, 5).await;
        let member = user(db, "member", UserRole::Member).await;

        for session in [&yoga, &spin] {
            send(
                &app,
                Method::POST,
                &format!("/api/sessions/{}/enrollments", session.id),
                Some(&token_for(&member)),
                None,
            )
            .await;
        }

        let (status, json) =
            send(&app, Method::GET, "/api/me/enrollments", Some(&token_for(&member)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }
}
