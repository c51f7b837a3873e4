//! SniT Core: shared error type and configuration for the support assistant.

pub mod config;
pub mod error;

pub use config::{DataPaths, SnitConfig, VectorIndexConfig};
pub use error::{Error, Result};
