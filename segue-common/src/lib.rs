//! # Segue Common Library
//!
//! Shared code for the segue workspace including:
//! - Error types
//! - The `TrackDescriptor` record supplied by analysis collaborators
//! - Musical key parsing and the harmonic (Camelot) wheel
//! - Configuration loading
//! - Tracing initialisation

pub mod config;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod logging;

pub use descriptor::TrackDescriptor;
pub use error::{Error, Result};
pub use key::{MusicalKey, Mode};
