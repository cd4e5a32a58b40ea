//! External force fields that bias probabilistic direction choice.

use glam::DVec3;

/// A vector-valued prior over space.
pub trait ForceField: Send + Sync {
    fn apply(&self, position: DVec3) -> DVec3;
}

impl<F> ForceField for F
where
    F: Fn(DVec3) -> DVec3 + Send + Sync,
{
    fn apply(&self, position: DVec3) -> DVec3 {
        self(position)
    }
}

/// The same force everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantForce(pub DVec3);

impl ForceField for ConstantForce {
    fn apply(&self, _position: DVec3) -> DVec3 {
        self.0
    }
}

/// Pull toward a point, decaying as `strength / (1 + d / radius)`.
#[derive(Debug, Clone, Copy)]
pub struct PointAttractor {
    pub center: DVec3,
    pub strength: f64,
    pub radius: f64,
}

/// Distances below this are treated as zero.
const SINGULARITY_EPS: f64 = 1e-10;

impl ForceField for PointAttractor {
    fn apply(&self, position: DVec3) -> DVec3 {
        let delta = self.center - position;
        let dist = delta.length();
        if dist < SINGULARITY_EPS || self.radius.abs() < SINGULARITY_EPS {
            return DVec3::ZERO;
        }
        delta / dist * (self.strength / (1.0 + dist / self.radius))
    }
}
