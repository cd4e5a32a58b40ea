//! Candidate filtering and selection.
//!
//! At every (sub)step the field is sampled, invalid candidates are dropped,
//! the rest are oriented against the reference direction and limited by the
//! angle threshold. Survivors are resolved to one sample by the configured
//! [`SelectionPolicy`], then optionally blended with the reference.

use crate::config::TrackConfig;
use fibertrace_core::{DVec3, FieldSampler, ForceField, Region, Sample, Xorshift64};

/// Values closer than this to a target are treated as equal to it.
const DELTA: f64 = 1e-6;

/// Keeps the force prior finite when `gforce` is zero.
const GFORCE_EPS: f64 = 1e-6;

/// How one candidate is picked out of several.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionPolicy {
    /// Smallest undirected angle to the reference.
    Deterministic,
    /// Weighted categorical choice.
    Probabilistic(ProbWeights),
}

/// Parameters of the probabilistic weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbWeights {
    /// Take the argmax instead of sampling.
    pub max: bool,
    /// Angular prior gain.
    pub angle_gain: f64,
    /// Exponent on candidate probabilities.
    pub power: f64,
    /// Force prior softness.
    pub gforce: f64,
}

/// Directed angle between two vectors, in degrees.
pub fn angle_deg(a: DVec3, b: DVec3) -> f64 {
    let cos = a.dot(b) / (a.length() * b.length());
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle between the lines spanned by two vectors, in degrees (0 to 90).
pub fn line_angle_deg(a: DVec3, b: DVec3) -> f64 {
    let cos = (a.normalize_or_zero().dot(b.normalize_or_zero())).abs();
    cos.min(1.0).acos().to_degrees()
}

/// Scales `values` to sum to one; all-zero input is left unchanged.
fn normalize_sum(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        })
        .0
}

/// Samples an index from a categorical distribution by cumulative sum.
///
/// Returns `None` when the draw falls past the total mass (zero or NaN weights).
fn draw(weights: &[f64], rng: &mut Xorshift64) -> Option<usize> {
    let unit = rng.next_f64();
    let mut cumsum = 0.0;
    weights.iter().position(|w| {
        cumsum += w;
        unit < cumsum
    })
}

/// Candidate selection bound to one tracker's field, regions, and options.
pub struct Selector<'a> {
    config: &'a TrackConfig,
    policy: SelectionPolicy,
    field: &'a dyn FieldSampler,
    track: Option<&'a dyn Region>,
    force: Option<&'a dyn ForceField>,
}

impl<'a> Selector<'a> {
    pub fn new(
        config: &'a TrackConfig,
        field: &'a dyn FieldSampler,
        track: Option<&'a dyn Region>,
        force: Option<&'a dyn ForceField>,
    ) -> Self {
        Self {
            config,
            policy: config.policy(),
            field,
            track,
            force,
        }
    }

    pub fn config(&self) -> &TrackConfig {
        self.config
    }

    /// Whether a raw field sample may be tracked through.
    ///
    /// Requires a finite position inside the track region, a unit orientation,
    /// and every bounded attribute present and within its bounds.
    pub fn valid(&self, sample: &Sample) -> bool {
        if !sample.position.is_finite() || !sample.is_unit() {
            return false;
        }
        if self.track.is_some_and(|r| !r.contains(sample.position)) {
            return false;
        }
        let above_low = self
            .config
            .low
            .iter()
            .all(|(name, &low)| sample.attr(name).is_some_and(|v| v >= low));
        let below_high = self
            .config
            .high
            .iter()
            .all(|(name, &high)| sample.attr(name).is_some_and(|v| v <= high));
        above_low && below_high
    }

    /// Selects the next sample at `position` given the incoming `reference` direction.
    ///
    /// `reverse` negates every candidate first (backward pass over a directed
    /// field). Returns `None` when no candidate survives, which ends the path.
    pub fn select(
        &self,
        position: DVec3,
        reference: DVec3,
        reverse: bool,
        rng: &mut Xorshift64,
    ) -> Option<Sample> {
        let mut candidates: Vec<Sample> = self
            .field
            .samples(position)
            .into_iter()
            .filter(|s| self.valid(s))
            .filter_map(|mut s| {
                if reverse {
                    s.orientation = -s.orientation;
                }
                if !self.config.vector && s.orientation.dot(reference) < 0.0 {
                    s.orientation = -s.orientation;
                }
                let angle = angle_deg(reference, s.orientation);
                s.angle = Some(angle);
                (angle <= self.config.angle).then_some(s)
            })
            .collect();

        let mut chosen = match candidates.len() {
            0 => return None,
            1 => candidates.pop()?,
            _ => self.resolve(position, reference, candidates, rng),
        };

        if (self.config.mixing - 1.0).abs() >= DELTA {
            let m = self.config.mixing;
            let blended = reference * (1.0 - m) + chosen.orientation * m;
            if blended.length() > DELTA {
                chosen.orientation = blended.normalize();
            }
        }

        Some(chosen)
    }

    /// Resolves several surviving candidates by policy.
    fn resolve(
        &self,
        position: DVec3,
        reference: DVec3,
        mut candidates: Vec<Sample>,
        rng: &mut Xorshift64,
    ) -> Sample {
        match self.policy {
            SelectionPolicy::Deterministic => {
                let dists: Vec<f64> = candidates
                    .iter()
                    .map(|c| -line_angle_deg(c.orientation, reference))
                    .collect();
                candidates.swap_remove(argmax(&dists))
            }
            SelectionPolicy::Probabilistic(weights) => {
                self.choose(position, candidates, weights, rng)
            }
        }
    }

    /// Picks one candidate with the probabilistic weighting rule.
    ///
    /// Used for multi-candidate steps and, in probabilistic mode, to reduce
    /// the starting candidates at a seed.
    pub fn choose(
        &self,
        position: DVec3,
        mut candidates: Vec<Sample>,
        params: ProbWeights,
        rng: &mut Xorshift64,
    ) -> Sample {
        let probs = self.weights(position, &candidates, params);
        let index = if params.max {
            argmax(&probs)
        } else {
            draw(&probs, rng).unwrap_or_else(|| rng.next_usize(candidates.len()))
        };
        candidates.swap_remove(index)
    }

    /// Normalized selection weights: probability^power × angle prior × force prior.
    pub fn weights(&self, position: DVec3, candidates: &[Sample], params: ProbWeights) -> Vec<f64> {
        let mut probs: Vec<f64> = candidates
            .iter()
            .map(|c| {
                let p = c.probability.unwrap_or(1.0);
                if (params.power - 1.0).abs() < DELTA {
                    p
                } else {
                    p.powf(params.power)
                }
            })
            .collect();
        normalize_sum(&mut probs);

        if params.angle_gain.abs() >= DELTA {
            let mut prior: Vec<f64> = candidates
                .iter()
                .map(|c| (-params.angle_gain * c.angle.unwrap_or(0.0) / self.config.angle).exp())
                .collect();
            normalize_sum(&mut prior);
            probs.iter_mut().zip(&prior).for_each(|(p, q)| *p *= q);
        }

        if let Some(force) = self.force {
            let mut prior = vec![1.0; candidates.len()];
            let f = force.apply(position);
            let norm = f.length();
            if norm >= DELTA {
                let dir = f / norm;
                let alignment: Vec<f64> = candidates
                    .iter()
                    .map(|c| {
                        let d = dir.dot(c.orientation);
                        if self.config.vector {
                            (d + 1.0) / 2.0
                        } else {
                            d.abs()
                        }
                    })
                    .collect();
                if params.gforce.abs() < DELTA {
                    let best = argmax(&alignment);
                    prior[best] = 1.0;
                    prior.iter_mut().enumerate().for_each(|(i, v)| {
                        if i != best {
                            *v = 0.0;
                        }
                    });
                } else {
                    for (factor, a) in prior.iter_mut().zip(&alignment) {
                        *factor = (-(1.0 - a) / (params.gforce + GFORCE_EPS)).exp();
                    }
                }
            }
            normalize_sum(&mut prior);
            probs.iter_mut().zip(&prior).for_each(|(p, q)| *p *= q);
        }

        normalize_sum(&mut probs);
        probs
    }
}
