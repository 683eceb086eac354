//! Core domain types, errors, and constants for permcache.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum, its coarse `ErrorKind` classification and
//!   the `Result` alias used by every other crate.
//! - **`types`**: validated newtypes for subject tokens, permission names and
//!   the application credential, plus the cached `PermissionSet` encoding.
//! - **`constants`**: cache keys, the permission delimiter and authority routes.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, ErrorKind, Result, Validate},
    types::*,
};
