pub mod handlers;
pub mod points;
pub mod ranking;
