//! Multi-threaded batch tracking.
//!
//! Seeds are split into contiguous slices, one per worker thread. Each
//! worker tracks its slice independently and results are merged by batch
//! index, so the output follows seed order however the threads finish.

use crate::tracker::Tracker;
use fibertrace_core::{Curves, DVec3, TrackError, Xorshift64};
use std::collections::BTreeMap;
use std::ops::Range;
use std::thread;
use tracing::{debug, error, info};

/// Progress is reported every this many percent of a batch.
const PROGRESS_STEP: usize = 5;

/// Contiguous index ranges covering `0..n` for `threads` workers.
///
/// Uses `min(threads, n)` slices of `ceil(n / slices)` seeds; trailing
/// empty slices are skipped.
pub fn partition(n: usize, threads: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let slices = threads.clamp(1, n);
    let count = n.div_ceil(slices);
    (0..slices)
        .map(|i| (i * count).min(n)..((i + 1) * count).min(n))
        .filter(|r| !r.is_empty())
        .collect()
}

impl Tracker {
    /// Worker thread count, resolving 0 to the available parallelism.
    pub fn thread_count(&self) -> usize {
        match self.config.threads {
            0 => thread::available_parallelism().map_or(1, usize::from),
            n => n,
        }
    }

    /// Tracks every seed and returns the curves in seed order.
    ///
    /// Blocks until all batches finish. A panicking worker fails the whole
    /// run with `TrackError::WorkerFailed`.
    pub fn run(&self, seeds: &[DVec3]) -> Result<Curves, TrackError> {
        let threads = self.thread_count();
        let slices = partition(seeds.len(), threads);
        let batches = slices.len();
        info!(
            seeds = seeds.len(),
            threads,
            batch_size = slices.first().map_or(0, |r| r.len()),
            "tracking started"
        );

        let results: BTreeMap<usize, Result<Curves, TrackError>> = if threads == 1 || batches <= 1 {
            slices
                .into_iter()
                .enumerate()
                .map(|(batch, range)| {
                    let offset = range.start;
                    (batch, self.run_batch(batch, batches, offset, &seeds[range]))
                })
                .collect()
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = slices
                    .into_iter()
                    .enumerate()
                    .map(|(batch, range)| {
                        let offset = range.start;
                        let slice = &seeds[range];
                        let handle =
                            scope.spawn(move || self.run_batch(batch, batches, offset, slice));
                        (batch, handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(batch, handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            error!(batch = batch + 1, "tracking worker panicked");
                            Err(TrackError::WorkerFailed { batch })
                        });
                        (batch, result)
                    })
                    .collect()
            })
        };

        let mut out = Curves::new();
        for (_, result) in results {
            out.append(result?);
        }

        info!(
            kept = out.non_empty(),
            seeds = seeds.len(),
            "kept {} of {} tracks",
            out.non_empty(),
            seeds.len()
        );
        Ok(out)
    }

    /// Tracks one contiguous slice of seeds starting at global index `offset`.
    fn run_batch(
        &self,
        batch: usize,
        batches: usize,
        offset: usize,
        seeds: &[DVec3],
    ) -> Result<Curves, TrackError> {
        let label = batch + 1;
        let n = seeds.len();
        debug!(batch = label, batches, seeds = n, "batch started");

        let mut out = Curves::new();
        let mut reported = 0;
        for (i, &seed) in seeds.iter().enumerate() {
            let percent = (100 * (i + 1)).div_ceil(n);
            if percent >= reported + PROGRESS_STEP {
                reported = percent;
                debug!(batch = label, percent, "batch progress");
            }

            let mut rng = Xorshift64::for_stream(self.config.rng_seed, (offset + i) as u64);
            if let Some(curve) = self.curve_for_seed(seed, &mut rng)? {
                out.push(curve);
            }
        }

        if let Some(filter) = &self.filter {
            debug!(batch = label, curves = out.len(), "batch filtering");
            let expected = out.len();
            out = filter.apply(out, self.config.emit_empty);
            if self.config.emit_empty && out.len() != expected {
                return Err(TrackError::FilterCardinality {
                    expected,
                    got: out.len(),
                });
            }
        }

        debug!(batch = label, curves = out.len(), "batch finished");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use crate::filter::{CurveFilter, FilterChain, IncludeFilter};
    use fibertrace_core::field_source::ConstantField;
    use fibertrace_core::region::{AxisBox, Sphere};
    use fibertrace_core::{Curve, Sample};
    use std::sync::Arc;
    use std::time::Duration;

    fn seeds_along_x(n: usize) -> Vec<DVec3> {
        (0..n).map(|i| DVec3::new(i as f64 * 10.0, 0.0, 0.0)).collect()
    }

    #[test]
    fn partition_covers_all_seeds_contiguously() {
        assert_eq!(partition(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition(7, 1), vec![0..7]);
        assert_eq!(partition(7, 0), vec![0..7]);
        assert!(partition(0, 4).is_empty());
    }

    #[test]
    fn partition_skips_trailing_empty_slices() {
        // ceil(10 / 4) = 3 gives 0..3, 3..6, 6..9, 9..10.
        assert_eq!(partition(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
        // ceil(9 / 6) = 2 leaves the sixth slice empty.
        assert_eq!(partition(9, 6).len(), 5);
    }

    #[test]
    fn zero_threads_uses_available_parallelism() {
        let tracker = Tracker::new(
            Arc::new(ConstantField::new(DVec3::X)),
            TrackConfig {
                threads: 0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(tracker.thread_count() >= 1);
    }

    #[test]
    fn output_follows_seed_order_despite_completion_order() {
        // Early seeds are the slowest, so later batches finish first.
        let field = |p: DVec3| {
            let index = (p.x / 10.0).round() as u64;
            thread::sleep(Duration::from_millis(20 - index.min(20)));
            vec![Sample::new(p, DVec3::X)]
        };
        let seeds = seeds_along_x(20);
        for threads in [1, 4, 20] {
            let config = TrackConfig {
                threads,
                mono: true,
                vector: true,
                min_length: 0.0,
                max_length: 0.0,
                ..Default::default()
            };
            let tracker = Tracker::new(Arc::new(field), config).unwrap();
            let curves = tracker.run(&seeds).unwrap();
            assert_eq!(curves.len(), 20, "threads = {threads}");
            for (curve, seed) in curves.iter().zip(&seeds) {
                assert_eq!(curve.vertices()[0], *seed, "threads = {threads}");
            }
        }
    }

    #[test]
    fn thread_count_does_not_change_probabilistic_output() {
        let field = ConstantField::empty()
            .with_candidate(Sample::new(DVec3::ZERO, DVec3::X).with_probability(0.6))
            .with_candidate(
                Sample::new(DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0).normalize())
                    .with_probability(0.4),
            )
            .within(AxisBox::new(DVec3::splat(-50.0), DVec3::splat(50.0)));
        let field = Arc::new(field);
        let seeds: Vec<DVec3> = (0..40)
            .map(|i| DVec3::new(i as f64 - 20.0, (i % 7) as f64, 0.0))
            .collect();
        let run = |threads: usize| {
            let config = TrackConfig {
                threads,
                prob: true,
                dispersion: 0.1,
                angle: 60.0,
                min_length: 2.0,
                max_length: 30.0,
                rng_seed: 99,
                ..Default::default()
            };
            Tracker::new(field.clone(), config).unwrap().run(&seeds).unwrap()
        };
        let single = run(1);
        assert!(single.non_empty() > 0);
        assert_eq!(single, run(8));
        assert_eq!(single, run(3));
    }

    #[test]
    fn emit_empty_keeps_one_curve_per_seed() {
        let field = ConstantField::new(DVec3::X).within(AxisBox::new(
            DVec3::new(-5.0, -1.0, -1.0),
            DVec3::new(5.0, 1.0, 1.0),
        ));
        let seeds = vec![
            DVec3::ZERO,
            DVec3::new(0.0, 10.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, -10.0, 0.0),
        ];
        let config = TrackConfig {
            threads: 2,
            min_length: 0.0,
            emit_empty: true,
            ..Default::default()
        };
        let tracker = Tracker::new(Arc::new(field), config).unwrap();
        let curves = tracker.run(&seeds).unwrap();
        assert_eq!(curves.len(), 4);
        assert_eq!(curves.non_empty(), 2);
        assert!(curves.get(1).unwrap().is_empty());
        assert!(curves.get(3).unwrap().is_empty());
    }

    #[test]
    fn filters_keep_cardinality_when_emitting_empty() {
        let field = ConstantField::new(DVec3::X).within(AxisBox::new(
            DVec3::new(-5.0, -20.0, -1.0),
            DVec3::new(5.0, 20.0, 1.0),
        ));
        let seeds: Vec<DVec3> = (0..9).map(|i| DVec3::new(0.0, i as f64 * 2.0, 0.0)).collect();
        let keep_low = IncludeFilter::new(Arc::new(AxisBox::new(
            DVec3::new(-10.0, -1.0, -1.0),
            DVec3::new(10.0, 5.0, 1.0),
        )));
        let chain = FilterChain::new().add(Box::new(keep_low));
        let config = TrackConfig {
            threads: 4,
            min_length: 0.0,
            emit_empty: true,
            ..Default::default()
        };
        let tracker = Tracker::new(Arc::new(field), config)
            .unwrap()
            .with_filter(Arc::new(chain));
        let curves = tracker.run(&seeds).unwrap();
        assert_eq!(curves.len(), 9);
        // Seeds at y = 0, 2, 4 survive.
        assert_eq!(curves.non_empty(), 3);
        assert!(curves.iter().skip(3).all(Curve::is_empty));
    }

    #[test]
    fn filter_dropping_curves_under_emit_empty_is_an_error() {
        let drop_all = |_curves: Curves, _preserve: bool| Curves::new();
        let filter: Arc<dyn CurveFilter> = Arc::new(drop_all);
        let config = TrackConfig {
            threads: 1,
            min_length: 0.0,
            emit_empty: true,
            ..Default::default()
        };
        let tracker = Tracker::new(Arc::new(ConstantField::new(DVec3::X)), config)
            .unwrap()
            .with_filter(filter.clone());
        let err = tracker.run(&seeds_along_x(3)).unwrap_err();
        assert!(matches!(
            err,
            TrackError::FilterCardinality {
                expected: 3,
                got: 0
            }
        ));

        let config = TrackConfig {
            threads: 1,
            min_length: 0.0,
            ..Default::default()
        };
        let tracker = Tracker::new(Arc::new(ConstantField::new(DVec3::X)), config)
            .unwrap()
            .with_filter(filter);
        assert!(tracker.run(&seeds_along_x(3)).unwrap().is_empty());
    }

    #[test]
    fn worker_panic_fails_the_run() {
        let field = |p: DVec3| {
            if p.x > 55.0 && p.x < 65.0 {
                panic!("sampler failure at {p}");
            }
            vec![Sample::new(p, DVec3::X)]
        };
        let config = TrackConfig {
            threads: 4,
            min_length: 0.0,
            max_length: 2.0,
            ..Default::default()
        };
        let tracker = Tracker::new(Arc::new(field), config).unwrap();
        // Seed 6 sits at x = 60 in the third of four batches.
        let err = tracker.run(&seeds_along_x(10)).unwrap_err();
        assert!(matches!(err, TrackError::WorkerFailed { batch: 2 }), "{err}");
    }

    #[test]
    fn empty_seed_list_gives_empty_output() {
        let tracker = Tracker::new(
            Arc::new(ConstantField::new(DVec3::X)),
            TrackConfig::default(),
        )
        .unwrap();
        assert!(tracker.run(&[]).unwrap().is_empty());
    }

    #[test]
    fn stop_and_track_regions_apply_across_threads() {
        let tracker = Tracker::new(
            Arc::new(ConstantField::new(DVec3::X)),
            TrackConfig {
                threads: 3,
                min_length: 0.0,
                max_length: 50.0,
                ..Default::default()
            },
        )
        .unwrap()
        .with_track_region(Arc::new(Sphere::new(DVec3::ZERO, 100.0)))
        .with_stop_region(Arc::new(Sphere::new(DVec3::new(0.0, 0.0, 30.0), 5.0)));
        let seeds: Vec<DVec3> = (0..6).map(|i| DVec3::new(0.0, 0.0, i as f64 * 10.0)).collect();
        let curves = tracker.run(&seeds).unwrap();
        // The seed at z = 30 starts inside the stop region.
        assert_eq!(curves.len(), 5);
        assert!(curves.iter().all(|c| c.len() == 51));
    }
}
