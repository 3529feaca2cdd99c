//! # Togo Server Library
//!
//! Startup plumbing for the togo server binary.
//!
//! ## Modules
//!
//! - `config`: Configuration loaded from the environment

pub mod config;
