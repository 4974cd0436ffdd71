//! Shared types for accelprof
//!
//! This crate contains the event, identity and trace types exchanged between
//! the device/transport layer, the performance counter and the report tools.

pub mod types;

// Re-export commonly used types
pub use types::{events::*, key::*, trace::*};
