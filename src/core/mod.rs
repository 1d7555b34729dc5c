//! Core types shared across the crate: the error enum, result alias, and the
//! error-mode toggle.

pub mod error;

pub use error::{ErrorMode, Result, TemplarError};
