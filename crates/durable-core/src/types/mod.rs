//! Type definitions for durability levels and executor configuration

mod config_types;
mod durability;

pub use config_types::*;
pub use durability::*;
