pub mod attendance;
pub mod notification;
pub mod role;
pub mod schedule;
