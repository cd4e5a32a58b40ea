//! Tracking configuration.
//!
//! [`TrackConfig`] holds every scalar option of a tracking run. It is fixed
//! for the duration of a run; collaborators (field, regions, force, filter)
//! are attached to the [`Tracker`](crate::Tracker) instead.

use crate::integrate::Integrator;
use crate::select::{ProbWeights, SelectionPolicy};
use fibertrace_core::params::{
    param_bool, param_bounds, param_f64, param_opt_f64, param_u64, param_usize,
};
use fibertrace_core::TrackError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_STEP: f64 = 1.0;
const DEFAULT_ANGLE: f64 = 35.0;
const DEFAULT_MIN_LENGTH: f64 = 10.0;
const DEFAULT_MAX_LENGTH: f64 = 1000.0;
const DEFAULT_MIXING: f64 = 1.0;
const DEFAULT_PROB_ANGLE: f64 = 0.0;
const DEFAULT_PROB_POWER: f64 = 1.0;
const DEFAULT_GFORCE: f64 = 0.0;
const DEFAULT_THREADS: usize = 5;
const DEFAULT_RNG_SEED: u64 = 42;

/// Scalar options of a tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Integration step size in world units.
    pub step: f64,
    /// Maximum turning angle per step, in degrees.
    pub angle: f64,
    /// Per-attribute lower validity bounds.
    pub low: BTreeMap<String, f64>,
    /// Per-attribute upper validity bounds.
    pub high: BTreeMap<String, f64>,
    /// Curves shorter than this (in world units) are dropped.
    pub min_length: f64,
    /// Curves never exceed this length.
    pub max_length: f64,
    /// Per-direction cap on integration distance; `None` is unbounded.
    pub reach: Option<f64>,
    /// Use Runge-Kutta-4 instead of Euler.
    pub rk4: bool,
    /// Standard deviation of isotropic orientation noise; 0 disables it.
    pub dispersion: f64,
    /// The field is directed: do not flip candidates into the reference hemisphere.
    pub vector: bool,
    /// Weight of the new direction when blending with the previous one.
    pub mixing: f64,
    /// Integrate in one direction only.
    pub mono: bool,
    /// Choose between candidates probabilistically.
    pub prob: bool,
    /// In probabilistic mode, take the most likely candidate instead of sampling.
    pub prob_max: bool,
    /// Gain of the angular prior; 0 disables it.
    pub prob_angle: f64,
    /// Exponent applied to candidate probabilities.
    pub prob_power: f64,
    /// Softness of the force prior; 0 picks the best-aligned candidate outright.
    pub gforce: f64,
    /// Worker threads; 0 uses the available parallelism.
    pub threads: usize,
    /// Emit a zero-vertex curve for every seed that yields nothing.
    pub emit_empty: bool,
    /// Base seed for per-seed random streams.
    pub rng_seed: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            angle: DEFAULT_ANGLE,
            low: BTreeMap::new(),
            high: BTreeMap::new(),
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            reach: None,
            rk4: false,
            dispersion: 0.0,
            vector: false,
            mixing: DEFAULT_MIXING,
            mono: false,
            prob: false,
            prob_max: false,
            prob_angle: DEFAULT_PROB_ANGLE,
            prob_power: DEFAULT_PROB_POWER,
            gforce: DEFAULT_GFORCE,
            threads: DEFAULT_THREADS,
            emit_empty: false,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

impl TrackConfig {
    /// Reads a configuration from a JSON object, falling back to defaults per key.
    pub fn from_json(params: &Value) -> Self {
        let d = Self::default();
        Self {
            step: param_f64(params, "step", d.step),
            angle: param_f64(params, "angle", d.angle),
            low: param_bounds(params, "low"),
            high: param_bounds(params, "high"),
            min_length: param_f64(params, "min_length", d.min_length),
            max_length: param_f64(params, "max_length", d.max_length),
            reach: param_opt_f64(params, "reach", d.reach),
            rk4: param_bool(params, "rk4", d.rk4),
            dispersion: param_f64(params, "dispersion", d.dispersion),
            vector: param_bool(params, "vector", d.vector),
            mixing: param_f64(params, "mixing", d.mixing),
            mono: param_bool(params, "mono", d.mono),
            prob: param_bool(params, "prob", d.prob),
            prob_max: param_bool(params, "prob_max", d.prob_max),
            prob_angle: param_f64(params, "prob_angle", d.prob_angle),
            prob_power: param_f64(params, "prob_power", d.prob_power),
            gforce: param_f64(params, "gforce", d.gforce),
            threads: param_usize(params, "threads", d.threads),
            emit_empty: param_bool(params, "emit_empty", d.emit_empty),
            rng_seed: param_u64(params, "rng_seed", d.rng_seed),
        }
    }

    /// Checks every option against its valid range.
    pub fn validate(&self) -> Result<(), TrackError> {
        let fail = |msg: String| Err(TrackError::InvalidConfig(msg));
        if !(self.step > 0.0 && self.step.is_finite()) {
            return fail(format!("step must be positive and finite, got {}", self.step));
        }
        if !(self.angle > 0.0 && self.angle <= 180.0) {
            return fail(format!("angle must be in (0, 180], got {}", self.angle));
        }
        if !(self.mixing > 0.0 && self.mixing <= 1.0) {
            return fail(format!("mixing must be in (0, 1], got {}", self.mixing));
        }
        if !(self.min_length >= 0.0) || !(self.max_length >= 0.0) {
            return fail("lengths must be non-negative".into());
        }
        if self.min_length > self.max_length {
            return fail(format!(
                "min_length {} exceeds max_length {}",
                self.min_length, self.max_length
            ));
        }
        if self.reach.is_some_and(|r| !(r >= 0.0)) {
            return fail("reach must be non-negative".into());
        }
        if !(self.dispersion >= 0.0) {
            return fail("dispersion must be non-negative".into());
        }
        if !(self.gforce >= 0.0) {
            return fail("gforce must be non-negative".into());
        }
        if !self.prob_power.is_finite() || !self.prob_angle.is_finite() {
            return fail("probabilistic weights must be finite".into());
        }
        Ok(())
    }

    /// Maximum number of steps along one curve: `floor(max_length / step)`.
    pub fn max_steps(&self) -> usize {
        (self.max_length / self.step).floor() as usize
    }

    /// Minimum number of vertices a curve needs: `ceil(min_length / step)`.
    pub fn min_vertices(&self) -> usize {
        (self.min_length / self.step).ceil() as usize
    }

    /// Per-direction step cap derived from `reach`.
    pub fn reach_steps(&self) -> usize {
        self.reach
            .map_or(usize::MAX, |r| (r / self.step).ceil() as usize)
    }

    pub fn policy(&self) -> SelectionPolicy {
        if self.prob {
            SelectionPolicy::Probabilistic(ProbWeights {
                max: self.prob_max,
                angle_gain: self.prob_angle,
                power: self.prob_power,
                gforce: self.gforce,
            })
        } else {
            SelectionPolicy::Deterministic
        }
    }

    pub fn integrator(&self) -> Integrator {
        if self.rk4 {
            Integrator::RungeKutta4
        } else {
            Integrator::Euler
        }
    }
}
