//! Data layer for the search audit.
//!
//! Loads exported Search Console rows, answers analytics queries over them,
//! and post-processes query rows: brand classification, cannibalization
//! detection, weekly trends and period-over-period comparison. The
//! [`analysis`] module ties these together into one audit report.

pub mod aggregator;
pub mod analysis;
pub mod brand;
pub mod cannibalization;
pub mod comparison;
pub mod reader;
pub mod source;
