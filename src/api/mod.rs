pub mod attendance;
pub mod notification;
