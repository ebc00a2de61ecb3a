pub mod auth;
pub mod debug_log;
