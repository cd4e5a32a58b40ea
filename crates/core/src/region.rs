//! Spatial membership tests used as track, stop, and trap regions.
//!
//! A [`Region`] answers two questions about a world-space point: whether it
//! is inside, and which integer label it carries (0 means "no region").
//! Implementations must be stateless so trackers can share them across
//! worker threads.

use crate::error::TrackError;
use glam::DVec3;

/// A labeled spatial predicate.
pub trait Region: Send + Sync {
    /// Integer label at `position`; 0 means outside every compartment.
    fn label(&self, position: DVec3) -> i32;

    fn contains(&self, position: DVec3) -> bool {
        self.label(position) != 0
    }
}

/// Solid ball with a fixed label.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: DVec3,
    pub radius: f64,
    pub label: i32,
}

impl Sphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self {
            center,
            radius,
            label: 1,
        }
    }

    pub fn with_label(mut self, label: i32) -> Self {
        self.label = label;
        self
    }
}

impl Region for Sphere {
    fn label(&self, position: DVec3) -> i32 {
        if position.distance_squared(self.center) <= self.radius * self.radius {
            self.label
        } else {
            0
        }
    }
}

/// Axis-aligned box, inclusive on both faces.
#[derive(Debug, Clone, Copy)]
pub struct AxisBox {
    pub min: DVec3,
    pub max: DVec3,
    pub label: i32,
}

impl AxisBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max, label: 1 }
    }

    pub fn with_label(mut self, label: i32) -> Self {
        self.label = label;
        self
    }
}

impl Region for AxisBox {
    fn label(&self, position: DVec3) -> i32 {
        let inside = position.cmpge(self.min).all() && position.cmple(self.max).all();
        if inside {
            self.label
        } else {
            0
        }
    }
}

/// Voxel label volume with nearest-voxel lookup.
///
/// Voxel `(i, j, k)` is centred at `origin + voxel * (i, j, k)` and data is
/// stored with `i` varying fastest. Points outside the grid have label 0.
#[derive(Debug, Clone)]
pub struct LabelGrid {
    dims: [usize; 3],
    origin: DVec3,
    voxel: f64,
    labels: Vec<i32>,
}

impl LabelGrid {
    /// Builds a grid, validating dimensions against the data length.
    pub fn new(
        dims: [usize; 3],
        origin: DVec3,
        voxel: f64,
        labels: Vec<i32>,
    ) -> Result<Self, TrackError> {
        let expected = voxel_count(dims, voxel)?;
        if labels.len() != expected {
            return Err(TrackError::DimensionMismatch {
                expected,
                got: labels.len(),
            });
        }
        Ok(Self {
            dims,
            origin,
            voxel,
            labels,
        })
    }

    /// A grid with every voxel labeled 0.
    pub fn zeros(dims: [usize; 3], origin: DVec3, voxel: f64) -> Result<Self, TrackError> {
        let len = voxel_count(dims, voxel)?;
        Self::new(dims, origin, voxel, vec![0; len])
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel
    }

    /// Sets the label of voxel `(i, j, k)`; out-of-range indices are ignored.
    pub fn set(&mut self, ijk: [usize; 3], label: i32) {
        if let Some(idx) = self.index(ijk) {
            self.labels[idx] = label;
        }
    }

    pub fn get(&self, ijk: [usize; 3]) -> i32 {
        self.index(ijk).map_or(0, |idx| self.labels[idx])
    }

    /// World-space centre of voxel `(i, j, k)`.
    pub fn voxel_center(&self, ijk: [usize; 3]) -> DVec3 {
        self.origin + self.voxel * DVec3::new(ijk[0] as f64, ijk[1] as f64, ijk[2] as f64)
    }

    /// Voxel indices with a nonzero label, in storage order.
    pub fn nonzero_voxels(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [nx, ny, _] = self.dims;
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l != 0)
            .map(move |(idx, _)| [idx % nx, (idx / nx) % ny, idx / (nx * ny)])
    }

    fn index(&self, [i, j, k]: [usize; 3]) -> Option<usize> {
        let [nx, ny, nz] = self.dims;
        (i < nx && j < ny && k < nz).then(|| i + nx * (j + ny * k))
    }

    /// Nearest voxel to a world position, or `None` outside the grid.
    pub fn locate(&self, position: DVec3) -> Option<[usize; 3]> {
        nearest_voxel(self.dims, self.origin, self.voxel, position)
    }
}

impl Region for LabelGrid {
    fn label(&self, position: DVec3) -> i32 {
        self.locate(position).map_or(0, |ijk| self.get(ijk))
    }
}

/// Validated voxel count for a grid of `dims` with spacing `voxel`.
pub(crate) fn voxel_count(dims: [usize; 3], voxel: f64) -> Result<usize, TrackError> {
    if dims.contains(&0) || voxel.is_nan() || voxel <= 0.0 {
        return Err(TrackError::InvalidDimensions);
    }
    dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]))
        .ok_or(TrackError::InvalidDimensions)
}

/// Rounds a world position to voxel indices, `None` when outside.
pub(crate) fn nearest_voxel(
    dims: [usize; 3],
    origin: DVec3,
    voxel: f64,
    position: DVec3,
) -> Option<[usize; 3]> {
    let rel = ((position - origin) / voxel).round();
    if !rel.is_finite() || rel.min_element() < 0.0 {
        return None;
    }
    let ijk = [rel.x as usize, rel.y as usize, rel.z as usize];
    (ijk[0] < dims[0] && ijk[1] < dims[1] && ijk[2] < dims[2]).then_some(ijk)
}

/// Union of regions: the label of the first member containing the point.
pub struct Union {
    members: Vec<Box<dyn Region>>,
}

impl Union {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Adds a member region (builder pattern).
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, region: Box<dyn Region>) -> Self {
        self.members.push(region);
        self
    }
}

impl Default for Union {
    fn default() -> Self {
        Self::new()
    }
}

impl Region for Union {
    fn label(&self, position: DVec3) -> i32 {
        self.members
            .iter()
            .map(|r| r.label(position))
            .find(|&l| l != 0)
            .unwrap_or(0)
    }
}
