//! HTTP route handlers

pub mod auth;
pub mod dashboard;
pub mod files;
pub mod progress;
pub mod topics;
