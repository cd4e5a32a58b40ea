//! Seed point generators.
//!
//! Seeds are plain world-space positions. These helpers build them from a
//! regular lattice, a ball, or the nonzero voxels of a label volume. All
//! random placement goes through the caller's [`Xorshift64`], so the same
//! generator state always yields the same seeds.

use crate::error::TrackError;
use crate::prng::Xorshift64;
use crate::region::LabelGrid;
use glam::DVec3;

/// Regular lattice covering `[min, max]` with the given spacing, x varying fastest.
///
/// Returns `TrackError::InvalidConfig` for a non-positive spacing.
pub fn lattice(min: DVec3, max: DVec3, spacing: f64) -> Result<Vec<DVec3>, TrackError> {
    if spacing.is_nan() || spacing <= 0.0 {
        return Err(TrackError::InvalidConfig(format!(
            "seed spacing must be positive, got {spacing}"
        )));
    }
    let counts = ((max - min) / spacing).floor();
    if counts.min_element() < 0.0 {
        return Ok(Vec::new());
    }
    let [nx, ny, nz] = [
        counts.x as usize + 1,
        counts.y as usize + 1,
        counts.z as usize + 1,
    ];
    let mut seeds = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                seeds.push(min + spacing * DVec3::new(i as f64, j as f64, k as f64));
            }
        }
    }
    Ok(seeds)
}

/// `count` points uniformly distributed inside a ball.
pub fn in_sphere(center: DVec3, radius: f64, count: usize, rng: &mut Xorshift64) -> Vec<DVec3> {
    let mut seeds = Vec::with_capacity(count);
    while seeds.len() < count {
        let p = DVec3::new(
            rng.next_range(-1.0, 1.0),
            rng.next_range(-1.0, 1.0),
            rng.next_range(-1.0, 1.0),
        );
        if p.length_squared() <= 1.0 {
            seeds.push(center + radius * p);
        }
    }
    seeds
}

/// `per_voxel` jittered points inside every nonzero voxel of `grid`.
///
/// With `per_voxel == 1` and no jitter wanted, use the voxel centers directly
/// via [`LabelGrid::voxel_center`].
pub fn from_labels(grid: &LabelGrid, per_voxel: usize, rng: &mut Xorshift64) -> Vec<DVec3> {
    let half = grid.voxel_size() / 2.0;
    grid.nonzero_voxels()
        .flat_map(|ijk| {
            let center = grid.voxel_center(ijk);
            (0..per_voxel)
                .map(|_| {
                    center
                        + DVec3::new(
                            rng.next_range(-half, half),
                            rng.next_range(-half, half),
                            rng.next_range(-half, half),
                        )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Random subset of at most `limit` seeds.
///
/// Seeds come back in draw order. When `limit` covers every seed the input is
/// returned unchanged and `rng` is not advanced.
pub fn subsample(mut seeds: Vec<DVec3>, limit: usize, rng: &mut Xorshift64) -> Vec<DVec3> {
    if limit >= seeds.len() {
        return seeds;
    }
    for i in 0..limit {
        let j = i + rng.next_usize(seeds.len() - i);
        seeds.swap(i, j);
    }
    seeds.truncate(limit);
    seeds
}
