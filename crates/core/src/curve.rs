//! Polyline output of the tracker: vertices plus per-vertex attribute channels.
//!
//! A [`Curve`] is assembled from the accepted samples of one seed. Its
//! channel set is fixed by the first sample; every later sample must carry
//! exactly the same attributes. [`Curves`] keeps curves in seed order and
//! may contain zero-vertex placeholders when a run emits empty curves.

use crate::error::TrackError;
use crate::sample::Sample;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered vertex list with named per-vertex scalar channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    vertices: Vec<DVec3>,
    channels: BTreeMap<String, Vec<f64>>,
}

impl Curve {
    /// A zero-vertex placeholder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Materializes accepted samples into a curve.
    ///
    /// Returns `TrackError::MissingChannel` or `TrackError::UnexpectedChannel`
    /// if a sample's attribute set differs from the first sample's.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, TrackError> {
        let Some(first) = samples.first() else {
            return Ok(Self::empty());
        };

        let mut channels: BTreeMap<String, Vec<f64>> = first
            .attr_names()
            .map(|name| (name.to_owned(), Vec::with_capacity(samples.len())))
            .collect();

        for (index, sample) in samples.iter().enumerate() {
            if let Some(extra) = sample.attr_names().find(|n| !channels.contains_key(*n)) {
                return Err(TrackError::UnexpectedChannel {
                    channel: extra.to_owned(),
                    index,
                });
            }
            for (name, values) in channels.iter_mut() {
                let value = sample
                    .attr(name)
                    .ok_or_else(|| TrackError::MissingChannel {
                        channel: name.clone(),
                        index,
                    })?;
                values.push(value);
            }
        }

        Ok(Self {
            vertices: samples.iter().map(|s| s.position).collect(),
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Sum of segment lengths.
    pub fn arc_length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }

    /// First and last vertex, or `None` for a placeholder.
    pub fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        Some((*self.vertices.first()?, *self.vertices.last()?))
    }

    /// Copy of the vertices `first..=last` with their channel values.
    ///
    /// Out-of-range bounds are clamped; an inverted range gives a placeholder.
    pub fn span(&self, first: usize, last: usize) -> Curve {
        let last = last.min(self.len().saturating_sub(1));
        if self.is_empty() || first > last {
            return Curve::empty();
        }
        Curve {
            vertices: self.vertices[first..=last].to_vec(),
            channels: self
                .channels
                .iter()
                .map(|(name, values)| (name.clone(), values[first..=last].to_vec()))
                .collect(),
        }
    }
}

/// Curves in seed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curves {
    curves: Vec<Curve>,
}

impl Curves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, curve: Curve) {
        self.curves.push(curve);
    }

    /// Appends every curve of `other`, keeping its order.
    pub fn append(&mut self, other: Curves) {
        self.curves.extend(other.curves);
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Number of curves with at least one vertex.
    pub fn non_empty(&self) -> usize {
        self.curves.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn get(&self, index: usize) -> Option<&Curve> {
        self.curves.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Curve> {
        self.curves.iter()
    }

    pub fn into_vec(self) -> Vec<Curve> {
        self.curves
    }
}

impl FromIterator<Curve> for Curves {
    fn from_iter<I: IntoIterator<Item = Curve>>(iter: I) -> Self {
        Self {
            curves: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Curves {
    type Item = Curve;
    type IntoIter = std::vec::IntoIter<Curve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.into_iter()
    }
}

impl<'a> IntoIterator for &'a Curves {
    type Item = &'a Curve;
    type IntoIter = std::slice::Iter<'a, Curve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.iter()
    }
}
