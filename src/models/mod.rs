pub mod auth;
pub mod dashboard;
pub mod error;
pub mod flow;
pub mod investment;
pub mod prices;
pub mod stake;
pub mod withdrawal;
