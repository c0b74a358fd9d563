// API module - HTTP endpoints

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod middleware;
pub mod promotions;
pub mod reviews;
pub mod stations;
pub mod wallet;
