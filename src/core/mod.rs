//! Core building blocks: values and their conversion, errors, the
//! cancellation context, and the database access layer.

pub mod context;
pub mod convert;
pub mod db;
pub mod error;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{Error, QueryError, Result};
