//! Command handlers.

pub mod config;
pub mod models;
pub mod tell;
