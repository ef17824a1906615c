//! Core types and utilities for the token price proxy
//!
//! This crate provides shared types used across all components:
//! - Chain identifiers and network families
//! - Normalized price and aggregate result types
//! - Per-service chain support table
//! - Address validation
//! - Configuration and error types

pub mod types;
pub mod chains;
pub mod address;
pub mod config;
pub mod errors;

pub use types::*;
pub use chains::*;
pub use address::*;
pub use config::*;
pub use errors::*;
