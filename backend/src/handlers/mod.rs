//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod notifications;
pub mod reports;
pub mod stations;
pub mod users;
pub mod weather;
