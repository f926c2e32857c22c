mod attendance_test;
mod enrollments_test;
mod health_test;
mod sessions_test;
mod tokens_test;
