//! # TuneGate Common Library
//!
//! Shared code for the TuneGate gateway:
//! - Canonical response envelope types
//! - Configuration loading and resolution
//! - Common error types

pub mod config;
pub mod envelope;
pub mod error;

pub use envelope::{CanonicalEnvelope, FailureKind, TierFailure, TierUsed};
pub use error::{Error, Result};
