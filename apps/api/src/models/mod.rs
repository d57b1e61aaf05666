pub mod doubt;
pub mod event;
pub mod leaderboard;
pub mod opportunity;
pub mod profile;
