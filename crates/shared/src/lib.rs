//! Shared types, errors, and configuration for Compta.
//!
//! This crate provides common types used across all other crates:
//! - Money amounts stored as integer minor units
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AccountingConfig, AppConfig};
pub use error::{AppError, AppResult};
