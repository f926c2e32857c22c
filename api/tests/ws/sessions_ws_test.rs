#[cfg(test)]
mod tests {
    use crate::helpers::app::{session_today, token_for, user};
    use crate::helpers::{connect_ws, make_test_app, make_test_router, send, spawn_server};
    use axum::http::{Method, StatusCode};
    use chrono::Utc;
    use db::models::user::UserRole;
    use futures::StreamExt;
    use serde_json::{Value, json};
    use tokio::time::{Duration, timeout};
    use tokio_tungstenite::tungstenite::{Error, protocol::Message};

    #[tokio::test]
    async fn enrolled_member_receives_attendance_events() {
        let (app, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let member = user(db, "member", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;
        send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/enrollments", session.id),
            Some(&token_for(&member)),
            None,
        )
        .await;

        let addr = spawn_server(make_test_router(state.clone())).await;
        let (mut socket, _) = connect_ws(
            &addr,
            &format!("sessions/{}", session.id),
            &token_for(&member),
        )
        .await
        .unwrap();

        // Give the server a moment to subscribe before publishing.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/sessions/{}/attendance/{}", session.id, member.id),
            Some(&token_for(&trainer)),
            Some(json!({ "date": Utc::now().date_naive(), "status": "present" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let frame = timeout(Duration::from_secs(2), async {
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => break text.to_string(),
                    Some(Ok(_)) => continue,
                    other => panic!("socket closed early: {other:?}"),
                }
            }
        })
        .await
        .expect("no event received");

        let envelope: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(envelope["event"], "attendance.recorded");
        assert_eq!(envelope["topic"], format!("sessions:{}", session.id));
        assert_eq!(envelope["payload"]["record"]["member_id"], member.id);
    }

    #[tokio::test]
    async fn outsiders_are_refused() {
        let (_, state) = make_test_app().await;
        let db = state.db();
        let trainer = user(db, "trainer", UserRole::Trainer).await;
        let outsider = user(db, "outsider", UserRole::Member).await;
        let session = session_today(db, trainer.id, 5).await;

        let addr = spawn_server(make_test_router(state.clone())).await;
        let result = connect_ws(
            &addr,
            &format!("sessions/{}", session.id),
            &token_for(&outsider),
        )
        .await;

        match result {
            Err(Error::Http(resp)) => assert_eq!(resp.status(), 403),
            Ok(_) => panic!("outsider should not connect"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let (_, state) = make_test_app().await;
        let admin = user(state.db(), "admin", UserRole::Admin).await;

        let addr = spawn_server(make_test_router(state.clone())).await;
        let result = connect_ws(&addr, "sessions/4040", &token_for(&admin)).await;

        match result {
            Err(Error::Http(resp)) => assert_eq!(resp.status(), 404),
            Ok(_) => panic!("unknown session should not connect"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
