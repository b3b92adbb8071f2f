//! Data models

pub mod auth;
pub mod confirmation;
pub mod user;
