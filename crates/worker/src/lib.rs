//! Background maintenance for status-bearing entities.
//!
//! The worker periodically hard-deletes rows that have sat in the DELETED
//! status for longer than the configured retention window.

pub mod config;
pub mod retention;
