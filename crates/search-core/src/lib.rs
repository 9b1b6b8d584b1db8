//! Shared types for the search audit workspace.
//!
//! Row and request models for the search analytics query service, the error
//! type, date and ISO-week helpers, number formatting, and CLI settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{AuditError, Result};
