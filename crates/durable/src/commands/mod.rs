//! CLI command implementations

pub mod change_email;
pub mod config;
