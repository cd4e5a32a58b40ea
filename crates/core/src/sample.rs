//! A single direction candidate produced by a field sampler.

use glam::DVec3;
use std::collections::BTreeMap;

/// Tolerance for the unit-norm check on orientations.
pub const UNIT_TOLERANCE: f64 = 1e-6;

/// A position, a direction, and the scalar attributes the field attached to it.
///
/// Field samplers create samples; the tracker flips, blends and annotates
/// them during selection and then appends them to a curve unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position: DVec3,
    pub orientation: DVec3,
    /// Intrinsic likelihood of this candidate (e.g. fiber volume fraction).
    pub probability: Option<f64>,
    /// Angle in degrees to the reference direction, set during selection.
    pub angle: Option<f64>,
    attrs: BTreeMap<String, f64>,
}

impl Sample {
    pub fn new(position: DVec3, orientation: DVec3) -> Self {
        Self {
            position,
            orientation,
            probability: None,
            angle: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    pub fn with_attr(mut self, name: &str, value: f64) -> Self {
        self.attrs.insert(name.to_owned(), value);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: f64) {
        self.attrs.insert(name.to_owned(), value);
    }

    pub fn attr(&self, name: &str) -> Option<f64> {
        self.attrs.get(name).copied()
    }

    /// Attribute names in sorted order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn attrs(&self) -> &BTreeMap<String, f64> {
        &self.attrs
    }

    /// True when the orientation has unit length. NaN components fail.
    pub fn is_unit(&self) -> bool {
        (self.orientation.length() - 1.0).abs() < UNIT_TOLERANCE
    }

    /// Copy of this sample relocated to `position`.
    pub fn at(&self, position: DVec3) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_probability_and_attrs() {
        let s = Sample::new(DVec3::ZERO, DVec3::X)
            .with_probability(0.4)
            .with_attr("frac", 0.4)
            .with_attr("fa", 0.7);
        assert_eq!(s.probability, Some(0.4));
        assert_eq!(s.attr("frac"), Some(0.4));
        assert_eq!(s.attr("md"), None);
        let names: Vec<&str> = s.attr_names().collect();
        assert_eq!(names, vec!["fa", "frac"]);
    }

    #[test]
    fn unit_check_accepts_normalized_and_rejects_others() {
        assert!(Sample::new(DVec3::ZERO, DVec3::new(0.6, 0.8, 0.0)).is_unit());
        assert!(!Sample::new(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0)).is_unit());
        assert!(!Sample::new(DVec3::ZERO, DVec3::ZERO).is_unit());
        assert!(!Sample::new(DVec3::ZERO, DVec3::new(f64::NAN, 0.0, 0.0)).is_unit());
    }

    #[test]
    fn at_moves_position_only() {
        let s = Sample::new(DVec3::ZERO, DVec3::Y).with_attr("fa", 0.3);
        let moved = s.at(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(moved.orientation, DVec3::Y);
        assert_eq!(moved.attr("fa"), Some(0.3));
    }

    #[test]
    fn set_attr_overwrites() {
        let mut s = Sample::new(DVec3::ZERO, DVec3::Z).with_attr("fa", 0.1);
        s.set_attr("fa", 0.9);
        assert_eq!(s.attr("fa"), Some(0.9));
    }
}
