//! HTTP handlers

pub mod auth;
pub mod confirm;
pub mod dashboard;
pub mod health;
