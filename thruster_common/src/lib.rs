//! Thruster Common Library
//!
//! Shared contracts for the vehicle thruster driver workspace: the data
//! model, interface naming, collaborator traits, error types and
//! configuration loading.
//!
//! # Module Structure
//!
//! - [`consts`] - Limits, default timings, naming constants
//! - [`config`] - TOML loading traits and shared configuration
//! - [`hal`] - Driver contracts, data model and vehicle configuration
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use thruster_common::prelude::*;
//!
//! let config = VehicleConfig::with_thruster_count(4);
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
