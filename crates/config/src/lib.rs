//! Configuration management for permcache
//!
//! This crate defines the settings needed to build a permission authorizer
//! and loads them from an optional JSON file and the process environment.

pub mod config;
pub mod loader;


pub use config::*;
pub use loader::*;
