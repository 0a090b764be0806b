//! segue-engine library interface
//!
//! Feature vectors, pairwise compatibility, quality gates and playlist
//! assembly over in-memory `TrackDescriptor` records.
//!
//! # Data Flow
//! TrackDescriptor → FeatureVectorEngine → FeatureVector → CompatibilityEngine
//! (pairwise) → PlaylistAssembler (selection + ordering) → Playlist + QualityReport

pub mod compatibility;
pub mod config;
pub mod error;
pub mod features;
pub mod playlist;
pub mod quality;

pub use crate::compatibility::{CompatibilityEngine, CompatibilityScore, CompatibilityTier, GenreCompatibilityMatrix};
pub use crate::config::{EngineSettings, SegueConfig};
pub use crate::error::{AssemblyError, FeatureError};
pub use crate::features::{FeatureVector, FeatureVectorEngine, VectorCache};
pub use crate::playlist::{AssemblyConfig, AssemblyEvent, EnergyCurve, Playlist, PlaylistAssembler};
pub use crate::quality::{QualityLevel, QualityReport};
