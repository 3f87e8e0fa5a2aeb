//! Configuration loading and validation
//!
//! The schema types live in `triviaduel-core`; this module reads them from
//! disk, expands environment references, applies overrides and validates.

pub mod loader;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use triviaduel_core::config::*;
pub use validation::{ValidationResult, Validator};
