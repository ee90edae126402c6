//! Business logic services

pub mod auth;
pub mod automator;
pub mod generators;
pub mod llm;
pub mod processors;
