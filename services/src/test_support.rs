use crate::notifier::{Notifier, SessionEvent};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use db::models::session::{Model as Session, NewSession};
use db::models::user::{Model as User, UserRole};
use sea_orm::DbConn;
use std::sync::Mutex;

/// Collects every event for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingNotifier {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

/// An instant on [`day`].
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

pub async fn user(db: &DbConn, name: &str, role: UserRole) -> User {
    User::create(db, name, &format!("{name}@gym.test"), name, role)
        .await
        .unwrap()
}

/// A 09:00 to 10:00 session on [`day`].
pub async fn session(db: &DbConn, trainer_id: i64, capacity: i32) -> Session {
    Session::create(
        db,
        NewSession {
            trainer_id,
            title: "Morning Spin".into(),
            location: Some("Studio A".into()),
            starts_on: day(),
            ends_on: day(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            capacity,
        },
    )
    .await
    .unwrap()
}

pub async fn members(db: &DbConn, n: usize) -> Vec<User> {
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(user(db, &format!("member{i}"), UserRole::Member).await);
    }
    out
}
