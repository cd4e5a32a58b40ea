#![deny(unsafe_code)]
//! Streamline tractography engine.
//!
//! Integrates paths through a direction field from a set of seeds:
//! - `config`: `TrackConfig`, the scalar options of a run
//! - `select`: candidate validation and the deterministic/probabilistic choice
//! - `integrate`: Euler and Runge-Kutta-4 steps
//! - `tracker`: per-seed tracking with stop, trap and length rules
//! - `batch`: ordered multi-threaded tracking of a seed list
//! - `filter`: region-driven selection of finished curves
//!
//! ```no_run
//! use fibertrace_core::field_source::ConstantField;
//! use fibertrace_core::DVec3;
//! use fibertrace_streamline::{TrackConfig, Tracker};
//! use std::sync::Arc;
//!
//! let tracker = Tracker::new(Arc::new(ConstantField::new(DVec3::X)), TrackConfig::default())?;
//! let curves = tracker.run(&[DVec3::ZERO])?;
//! println!("{} curves", curves.len());
//! # Ok::<(), fibertrace_core::TrackError>(())
//! ```

pub mod batch;
pub mod config;
pub mod filter;
pub mod integrate;
pub mod select;
pub mod tracker;

pub use batch::partition;
pub use config::TrackConfig;
pub use filter::{
    ConnectFilter, ContainFilter, CurveFilter, ExcludeFilter, FilterChain, IncludeFilter, MaxCurves,
};
pub use integrate::Integrator;
pub use select::{ProbWeights, SelectionPolicy, Selector};
pub use tracker::Tracker;
