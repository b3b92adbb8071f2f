//! reporacoon session authentication service
//! RS256 session tokens in an HttpOnly cookie, a gate over protected paths,
//! and single-use email confirmation links

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
