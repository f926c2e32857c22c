//! Scheduling core: session registry, enrollment and waitlist, attendance
//! tokens and the attendance ledger.
//!
//! Every write path runs in a single database transaction. Work that races on
//! shared counters is serialized per key by [`locks`] and backed by conditional
//! updates and unique indexes in storage.

pub mod attendance_ledger;
pub mod attendance_token;
pub mod directory;
pub mod enrollment;
pub mod error;
pub mod locks;
pub mod notifier;
pub mod retry;
pub mod session_registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ErrorKind, ServiceError};
pub use notifier::{NoopNotifier, Notifier, SessionEvent};

pub type ServiceResult<T> = Result<T, ServiceError>;
