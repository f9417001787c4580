//! Domain model for kviz
//!
//! Core identifier newtypes and structured errors:
//! - Compile-time safety for the cross-track index space
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

pub use errors::TraceError;
pub use types::{EventIdx, GroupIdx, Koid, ObjectKind, TrackIdx};
