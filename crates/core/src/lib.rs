#![deny(unsafe_code)]
//! Core types and traits for the fibertrace streamline tractography engine.
//!
//! Provides the per-step `Sample`, the `Curve`/`Curves` output model, the
//! collaborator traits the tracker consumes (`FieldSampler`, `Region`,
//! `ForceField`) with a set of in-memory implementations, seed generators,
//! the `Xorshift64` PRNG, JSON parameter helpers, and `TrackError`.

pub mod curve;
pub mod error;
pub mod field_source;
pub mod force;
pub mod params;
pub mod prng;
pub mod region;
pub mod sample;
pub mod seed;

pub use curve::{Curve, Curves};
pub use error::TrackError;
pub use field_source::FieldSampler;
pub use force::ForceField;
pub use prng::Xorshift64;
pub use region::Region;
pub use sample::Sample;

pub use glam::DVec3;
