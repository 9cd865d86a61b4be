pub mod core;
pub mod courses;
pub mod grading;
pub mod messages;
pub mod uploads;
pub mod users;
