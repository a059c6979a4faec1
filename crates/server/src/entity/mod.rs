//! Database entities touched by the notification flow.

pub mod alerts_log;
pub mod broadcast_message;
pub mod user;
