//! Per-seed streamline tracking.
//!
//! A [`Tracker`] owns one [`TrackConfig`] and the shared read-only
//! collaborators of a run. [`Tracker::track_seed`] turns one seed into the
//! accepted sample list of one streamline; [`Tracker::run`] fans a seed list
//! out over worker threads.

use crate::config::TrackConfig;
use crate::filter::CurveFilter;
use crate::select::{SelectionPolicy, Selector};
use fibertrace_core::{
    Curve, DVec3, FieldSampler, ForceField, Region, Sample, TrackError, Xorshift64,
};
use std::sync::Arc;

/// Streamline tracker: configuration plus attached collaborators.
pub struct Tracker {
    pub(crate) config: TrackConfig,
    field: Arc<dyn FieldSampler>,
    track: Option<Arc<dyn Region>>,
    stop: Option<Arc<dyn Region>>,
    trap: Option<Arc<dyn Region>>,
    force: Option<Arc<dyn ForceField>>,
    pub(crate) filter: Option<Arc<dyn CurveFilter>>,
}

impl Tracker {
    /// Creates a tracker over `field`, rejecting an invalid configuration.
    pub fn new(field: Arc<dyn FieldSampler>, config: TrackConfig) -> Result<Self, TrackError> {
        config.validate()?;
        Ok(Self {
            config,
            field,
            track: None,
            stop: None,
            trap: None,
            force: None,
            filter: None,
        })
    }

    /// Samples outside this region are invalid.
    pub fn with_track_region(mut self, region: Arc<dyn Region>) -> Self {
        self.track = Some(region);
        self
    }

    /// Paths may not enter this region.
    pub fn with_stop_region(mut self, region: Arc<dyn Region>) -> Self {
        self.stop = Some(region);
        self
    }

    /// Labeled compartments: a path that enters one ends when it leaves it.
    pub fn with_trap_region(mut self, region: Arc<dyn Region>) -> Self {
        self.trap = Some(region);
        self
    }

    /// Prior biasing probabilistic choices toward the force direction.
    pub fn with_force(mut self, force: Arc<dyn ForceField>) -> Self {
        self.force = Some(force);
        self
    }

    /// Applied to every batch of curves before merging.
    pub fn with_filter(mut self, filter: Arc<dyn CurveFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn selector(&self) -> Selector<'_> {
        Selector::new(
            &self.config,
            self.field.as_ref(),
            self.track.as_deref(),
            self.force.as_deref(),
        )
    }

    fn in_stop(&self, position: DVec3) -> bool {
        self.stop.as_ref().is_some_and(|r| r.contains(position))
    }

    fn trap_label(&self, position: DVec3) -> i32 {
        self.trap.as_ref().map_or(0, |r| r.label(position))
    }

    /// Valid starting samples at `seed`.
    ///
    /// Applies dispersion, drops starts inside the stop region or failing
    /// validation, and in probabilistic mode reduces the survivors to one.
    pub fn starts(&self, selector: &Selector<'_>, seed: DVec3, rng: &mut Xorshift64) -> Vec<Sample> {
        let sigma = self.config.dispersion;
        let starts: Vec<Sample> = self
            .field
            .samples(seed)
            .into_iter()
            .filter_map(|mut start| {
                if sigma > 0.0 {
                    start.orientation =
                        (start.orientation + rng.next_gaussian_vec3() * sigma).normalize_or_zero();
                }
                let keep = !self.in_stop(start.position) && selector.valid(&start);
                keep.then_some(start)
            })
            .collect();

        match self.config.policy() {
            SelectionPolicy::Probabilistic(weights) if !starts.is_empty() => {
                vec![selector.choose(seed, starts, weights, rng)]
            }
            _ => starts,
        }
    }

    /// One integration step plus the stop-region entry gate.
    fn next(
        &self,
        selector: &Selector<'_>,
        input: &Sample,
        reverse: bool,
        rng: &mut Xorshift64,
    ) -> Option<Sample> {
        let sample = self
            .config
            .integrator()
            .advance(selector, input, reverse, rng)?;
        if !self.in_stop(input.position) && self.in_stop(sample.position) {
            return None;
        }
        Some(sample)
    }

    /// Integrates one direction from `start`, returning the new samples only.
    ///
    /// Ends on no candidate, `budget` samples, the reach cap, leaving a trap
    /// compartment that was entered, or a stop-region sample after a start
    /// inside the stop region. A start inside a trap compartment yields nothing.
    fn follow(
        &self,
        selector: &Selector<'_>,
        start: &Sample,
        reverse: bool,
        budget: usize,
        rng: &mut Xorshift64,
    ) -> Vec<Sample> {
        let trap_start = self.trap_label(start.position);
        if trap_start > 0 {
            return Vec::new();
        }
        let reach = self.config.reach_steps();
        let mut trap_prev = trap_start;
        let stop_start = self.in_stop(start.position);
        let mut path: Vec<Sample> = Vec::new();

        while path.len() < budget {
            let current = path.last().unwrap_or(start);
            let Some(next) = self.next(selector, current, reverse, rng) else {
                break;
            };
            if path.len() >= reach {
                break;
            }

            let trap_next = self.trap_label(next.position);
            let stop_next = self.in_stop(next.position);
            if trap_next != trap_prev && trap_prev != 0 && trap_prev != trap_start {
                break;
            }
            if stop_next && stop_start {
                break;
            }

            trap_prev = trap_next;
            path.push(next);
        }
        path
    }

    /// Tracks one seed, returning its accepted samples in curve order.
    ///
    /// `None` when the seed has no valid start or the path is shorter than
    /// the minimum vertex count.
    pub fn track_seed(&self, seed: DVec3, rng: &mut Xorshift64) -> Option<Vec<Sample>> {
        let selector = self.selector();
        let mut starts = self.starts(&selector, seed, rng);
        if starts.is_empty() {
            return None;
        }
        let mut start = starts.swap_remove(rng.next_usize(starts.len()));
        let max_steps = self.config.max_steps();

        let samples: Vec<Sample> = if self.config.mono {
            if !self.config.vector && rng.next_bool() {
                start.orientation = -start.orientation;
            }
            let forward = self.follow(&selector, &start, false, max_steps, rng);
            std::iter::once(start).chain(forward).collect()
        } else {
            let forward = self.follow(&selector, &start, false, max_steps, rng);
            let mut flipped = start.clone();
            flipped.orientation = -flipped.orientation;
            let budget = max_steps - forward.len();
            let backward = self.follow(&selector, &flipped, self.config.vector, budget, rng);

            let mut samples: Vec<Sample> = forward.into_iter().rev().collect();
            samples.push(start);
            samples.extend(backward);
            samples
        };

        (samples.len() >= self.config.min_vertices()).then_some(samples)
    }

    /// Tracks one seed into a curve.
    ///
    /// Returns an empty placeholder instead of `None` when `emit_empty` is set.
    pub fn curve_for_seed(
        &self,
        seed: DVec3,
        rng: &mut Xorshift64,
    ) -> Result<Option<Curve>, TrackError> {
        match self.track_seed(seed, rng) {
            Some(samples) => Curve::from_samples(&samples).map(Some),
            None if self.config.emit_empty => Ok(Some(Curve::empty())),
            None => Ok(None),
        }
    }
}
