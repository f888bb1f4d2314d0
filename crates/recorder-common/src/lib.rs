//! # Recorder Common
//!
//! Shared types, errors, and constants used across the SRV recorder.
//!
//! ## Modules
//! - `types` - Core data structures (Lease, Member, SrvTarget)
//! - `error` - Error taxonomy and the crate-wide `Result` alias
//! - `constants` - Shared defaults and store key layout

pub mod constants;
pub mod error;
pub mod types;

pub use error::{RecorderError, Result};
pub use types::*;
