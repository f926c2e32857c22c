pub mod attendance_record;
pub mod attendance_token;
pub mod enrollment;
pub mod session;
pub mod token_scan;
pub mod user;

pub use attendance_record::Entity as AttendanceRecord;
pub use attendance_token::Entity as AttendanceToken;
pub use enrollment::Entity as Enrollment;
pub use session::Entity as ClassSession;
pub use token_scan::Entity as TokenScan;
pub use user::Entity as User;
