//! Shared types, error model, and configuration for Doxograph.
//!
//! This crate is the foundation depended on by all other Doxograph crates.
//! It provides:
//! - [`DoxographError`] — the unified error type
//! - Domain types ([`RefId`], [`Kind`], [`Visibility`], [`SourceLocation`])
//! - Configuration ([`BuildConfig`], [`DuplicateIdPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{BuildConfig, DuplicateIdPolicy, load_config_from};
pub use error::{DoxographError, Result};
pub use types::{Kind, Modifiers, RefId, SourceLocation, Visibility};
