//! Field samplers: sources of direction candidates at points in 3D space.
//!
//! A [`FieldSampler`] returns zero or more [`Sample`]s at a position. An
//! empty list means "outside the sampled domain". Several candidates at one
//! position model crossing or fanning fibers; the tracker picks between them.
//! Samplers may return unnormalized orientations; the tracker validates.
//!
//! Implementations include fixed candidate sets, analytic flows (vortex,
//! curl noise), a voxel grid of fiber peaks, and combinators that restrict
//! or merge other samplers.

use crate::error::TrackError;
use crate::region::{nearest_voxel, voxel_count, AxisBox, Region};
use crate::sample::Sample;
use glam::DVec3;
use noise::{NoiseFn, Perlin};

/// A source of direction candidates.
///
/// Shared read-only across tracking threads, hence `Send + Sync`.
pub trait FieldSampler: Send + Sync {
    fn samples(&self, position: DVec3) -> Vec<Sample>;
}

impl<F> FieldSampler for F
where
    F: Fn(DVec3) -> Vec<Sample> + Send + Sync,
{
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        self(position)
    }
}

/// Attribute name carrying a peak's volume fraction.
pub const FRAC: &str = "frac";

/// Attribute name carrying the magnitude of an analytic flow.
pub const MAGNITUDE: &str = "magnitude";

/// Below this magnitude an analytic flow has no defined direction.
const DEGENERATE_EPS: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Fixed candidates
// ---------------------------------------------------------------------------

/// The same candidate list everywhere, optionally limited to a box.
pub struct ConstantField {
    candidates: Vec<Sample>,
    bounds: Option<AxisBox>,
}

impl ConstantField {
    /// A single candidate along `direction` with probability 1.
    pub fn new(direction: DVec3) -> Self {
        Self {
            candidates: vec![Sample::new(DVec3::ZERO, direction).with_probability(1.0)],
            bounds: None,
        }
    }

    /// An empty field; add candidates with [`ConstantField::with_candidate`].
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            bounds: None,
        }
    }

    /// Adds a candidate; its position is replaced on every query.
    pub fn with_candidate(mut self, candidate: Sample) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Returns no candidates outside `bounds`.
    pub fn within(mut self, bounds: AxisBox) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

impl FieldSampler for ConstantField {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        if self.bounds.is_some_and(|b| !b.contains(position)) {
            return Vec::new();
        }
        self.candidates.iter().map(|c| c.at(position)).collect()
    }
}

// ---------------------------------------------------------------------------
// Analytic flows
// ---------------------------------------------------------------------------

/// Circulation around an axis through `center`: direction is `axis × r`.
pub struct VortexField {
    pub center: DVec3,
    pub axis: DVec3,
}

impl VortexField {
    pub fn new(center: DVec3, axis: DVec3) -> Self {
        Self {
            center,
            axis: axis.normalize_or_zero(),
        }
    }
}

impl FieldSampler for VortexField {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        let flow = self.axis.cross(position - self.center);
        let magnitude = flow.length();
        if magnitude < DEGENERATE_EPS {
            return Vec::new();
        }
        vec![Sample::new(position, flow / magnitude)
            .with_probability(1.0)
            .with_attr(MAGNITUDE, magnitude)]
    }
}

/// Curl of a Perlin vector potential: a smooth, divergence-free 3D flow.
pub struct CurlNoiseField {
    noise: Perlin,
    scale: f64,
    eps: f64,
}

impl CurlNoiseField {
    /// Creates a curl-noise sampler with finite-difference epsilon 0.001.
    pub fn new(scale: f64, seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
            scale,
            eps: 0.001,
        }
    }

    /// Vector potential; components are the same noise at offset coordinates.
    fn potential(&self, p: DVec3) -> DVec3 {
        DVec3::new(
            self.noise.get([p.x, p.y, p.z]),
            self.noise.get([p.x + 100.0, p.y + 100.0, p.z + 100.0]),
            self.noise.get([p.x - 100.0, p.y + 50.0, p.z - 50.0]),
        )
    }

    fn curl(&self, p: DVec3) -> DVec3 {
        let e = self.eps;
        let dx = (self.potential(p + DVec3::X * e) - self.potential(p - DVec3::X * e)) / (2.0 * e);
        let dy = (self.potential(p + DVec3::Y * e) - self.potential(p - DVec3::Y * e)) / (2.0 * e);
        let dz = (self.potential(p + DVec3::Z * e) - self.potential(p - DVec3::Z * e)) / (2.0 * e);
        DVec3::new(dy.z - dz.y, dz.x - dx.z, dx.y - dy.x)
    }
}

impl FieldSampler for CurlNoiseField {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        if self.scale.abs() < DEGENERATE_EPS {
            return Vec::new();
        }
        let flow = self.curl(position * self.scale);
        let magnitude = flow.length();
        if !(magnitude > DEGENERATE_EPS) {
            return Vec::new();
        }
        vec![Sample::new(position, flow / magnitude)
            .with_probability(1.0)
            .with_attr(MAGNITUDE, magnitude)]
    }
}

// ---------------------------------------------------------------------------
// Voxel peaks
// ---------------------------------------------------------------------------

/// Voxel grid of fiber peaks (direction, volume fraction), nearest-voxel lookup.
///
/// Every returned candidate carries its fraction both as probability and as
/// the [`FRAC`] attribute, so a low bound on `frac` acts as a tracking
/// threshold. Positions outside the grid yield no candidates.
#[derive(Debug, Clone)]
pub struct PeakGrid {
    dims: [usize; 3],
    origin: DVec3,
    voxel: f64,
    peaks: Vec<Vec<(DVec3, f64)>>,
}

impl PeakGrid {
    pub fn new(dims: [usize; 3], origin: DVec3, voxel: f64) -> Result<Self, TrackError> {
        let len = voxel_count(dims, voxel)?;
        Ok(Self {
            dims,
            origin,
            voxel,
            peaks: vec![Vec::new(); len],
        })
    }

    /// Appends a peak to voxel `(i, j, k)`; out-of-range indices are ignored.
    pub fn push_peak(&mut self, [i, j, k]: [usize; 3], direction: DVec3, fraction: f64) {
        let [nx, ny, nz] = self.dims;
        if i < nx && j < ny && k < nz {
            self.peaks[i + nx * (j + ny * k)].push((direction, fraction));
        }
    }

    /// Fills every voxel using `f(voxel_center)`.
    pub fn fill_with(&mut self, f: impl Fn(DVec3) -> Vec<(DVec3, f64)>) {
        let [nx, ny, _] = self.dims;
        for (idx, peaks) in self.peaks.iter_mut().enumerate() {
            let ijk = DVec3::new(
                (idx % nx) as f64,
                ((idx / nx) % ny) as f64,
                (idx / (nx * ny)) as f64,
            );
            *peaks = f(self.origin + self.voxel * ijk);
        }
    }
}

impl FieldSampler for PeakGrid {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        let Some([i, j, k]) = nearest_voxel(self.dims, self.origin, self.voxel, position) else {
            return Vec::new();
        };
        let [nx, ny, _] = self.dims;
        self.peaks[i + nx * (j + ny * k)]
            .iter()
            .filter(|(_, frac)| *frac > 0.0)
            .map(|&(dir, frac)| {
                Sample::new(position, dir)
                    .with_probability(frac)
                    .with_attr(FRAC, frac)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Restricts a sampler to the inside of a region.
pub struct MaskedField {
    inner: Box<dyn FieldSampler>,
    region: Box<dyn Region>,
}

impl MaskedField {
    pub fn new(inner: Box<dyn FieldSampler>, region: Box<dyn Region>) -> Self {
        Self { inner, region }
    }
}

impl FieldSampler for MaskedField {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        if self.region.contains(position) {
            self.inner.samples(position)
        } else {
            Vec::new()
        }
    }
}

/// Concatenates the candidates of several samplers into one multimodal field.
pub struct CompositeField {
    sources: Vec<Box<dyn FieldSampler>>,
}

impl CompositeField {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a source to the composite (builder pattern).
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, source: Box<dyn FieldSampler>) -> Self {
        self.sources.push(source);
        self
    }
}

impl Default for CompositeField {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSampler for CompositeField {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        self.sources
            .iter()
            .flat_map(|s| s.samples(position))
            .collect()
    }
}
