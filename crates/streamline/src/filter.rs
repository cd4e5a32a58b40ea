//! Region-driven selection of finished curves.
//!
//! Filters take a [`Curves`] batch and return the survivors in their
//! input order. With `preserve_cardinality` set, rejected curves are
//! replaced by empty placeholders instead of being removed, so seed
//! positions in the output stay aligned. Empty curves always pass through.

use fibertrace_core::{Curve, Curves, Region, Xorshift64};
use std::sync::Arc;

/// Post-processing step over a batch of curves.
pub trait CurveFilter: Send + Sync {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves;
}

impl<F> CurveFilter for F
where
    F: Fn(Curves, bool) -> Curves + Send + Sync,
{
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        self(curves, preserve_cardinality)
    }
}

/// Keeps curves for which `keep` holds.
fn retain(curves: Curves, preserve: bool, keep: impl Fn(&Curve) -> bool) -> Curves {
    curves
        .into_iter()
        .filter_map(|curve| {
            if curve.is_empty() || keep(&curve) {
                Some(curve)
            } else if preserve {
                Some(Curve::empty())
            } else {
                None
            }
        })
        .collect()
}

/// Keeps curves that touch a region.
pub struct IncludeFilter {
    pub region: Arc<dyn Region>,
    /// Only the first and last vertex count as touching.
    pub endpoints: bool,
}

impl IncludeFilter {
    pub fn new(region: Arc<dyn Region>) -> Self {
        Self {
            region,
            endpoints: false,
        }
    }

    /// Keeps curves with an endpoint inside the region.
    pub fn endpoints(region: Arc<dyn Region>) -> Self {
        Self {
            region,
            endpoints: true,
        }
    }
}

impl CurveFilter for IncludeFilter {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        retain(curves, preserve_cardinality, |curve| {
            if self.endpoints {
                curve
                    .endpoints()
                    .is_some_and(|(a, b)| self.region.contains(a) || self.region.contains(b))
            } else {
                curve.vertices().iter().any(|&v| self.region.contains(v))
            }
        })
    }
}

/// Drops curves that touch a region.
pub struct ExcludeFilter {
    pub region: Arc<dyn Region>,
}

impl CurveFilter for ExcludeFilter {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        retain(curves, preserve_cardinality, |curve| {
            !curve.vertices().iter().any(|&v| self.region.contains(v))
        })
    }
}

/// Keeps curves with at least `fraction` of their vertices inside a region.
pub struct ContainFilter {
    pub region: Arc<dyn Region>,
    pub fraction: f64,
}

impl CurveFilter for ContainFilter {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        retain(curves, preserve_cardinality, |curve| {
            let inside = curve
                .vertices()
                .iter()
                .filter(|&&v| self.region.contains(v))
                .count();
            inside as f64 / curve.len() as f64 >= self.fraction
        })
    }
}

/// Keeps the segment of each curve that connects two differently labelled
/// compartments of `region`.
///
/// The first and last labelled vertices must carry different nonzero labels
/// and be at least two vertices apart; the curve is trimmed to that span.
pub struct ConnectFilter {
    pub region: Arc<dyn Region>,
}

impl ConnectFilter {
    fn connection(&self, curve: &Curve) -> Option<Curve> {
        let labels: Vec<i32> = curve
            .vertices()
            .iter()
            .map(|&v| self.region.label(v))
            .collect();
        let first = labels.iter().position(|&l| l != 0)?;
        let last = labels.iter().rposition(|&l| l != 0)?;
        (last - first >= 2 && labels[first] != labels[last]).then(|| curve.span(first, last))
    }
}

impl CurveFilter for ConnectFilter {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        curves
            .into_iter()
            .filter_map(|curve| {
                if curve.is_empty() {
                    return Some(curve);
                }
                match self.connection(&curve) {
                    Some(segment) => Some(segment),
                    None if preserve_cardinality => Some(Curve::empty()),
                    None => None,
                }
            })
            .collect()
    }
}

/// Random order-preserving subset of at most `count` non-empty curves.
///
/// When attached to a tracker this applies to each batch separately; apply
/// it to the merged output for a global cap.
pub struct MaxCurves {
    pub count: usize,
    pub seed: u64,
}

impl CurveFilter for MaxCurves {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        let mut indices: Vec<usize> = curves
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, _)| i)
            .collect();
        if indices.len() <= self.count {
            return curves;
        }

        // Partial Fisher-Yates: the first `count` entries become the sample.
        let mut rng = Xorshift64::new(self.seed);
        for i in 0..self.count {
            let j = i + rng.next_usize(indices.len() - i);
            indices.swap(i, j);
        }
        indices.truncate(self.count);
        indices.sort_unstable();

        let mut chosen = indices.into_iter().peekable();
        curves
            .into_iter()
            .enumerate()
            .filter_map(|(i, curve)| {
                if chosen.next_if_eq(&i).is_some() || curve.is_empty() {
                    Some(curve)
                } else if preserve_cardinality {
                    Some(Curve::empty())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Applies filters in order.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn CurveFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter (builder pattern).
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, filter: Box<dyn CurveFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl CurveFilter for FilterChain {
    fn apply(&self, curves: Curves, preserve_cardinality: bool) -> Curves {
        self.filters
            .iter()
            .fold(curves, |acc, f| f.apply(acc, preserve_cardinality))
    }
}
