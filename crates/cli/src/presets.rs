//! Synthetic field presets: maps field names to sampler implementations.
//!
//! Every preset lives in the cube `[-extent, extent]³` and samples nothing
//! outside it, so tracks end at the domain boundary.

use fibertrace_core::field_source::{
    ConstantField, CurlNoiseField, MaskedField, PeakGrid, VortexField,
};
use fibertrace_core::region::AxisBox;
use fibertrace_core::{DVec3, FieldSampler, Sample, TrackError};

/// All available preset names.
const FIELD_NAMES: &[&str] = &["uniform", "crossing", "vortex", "curl"];

/// Half-width of the crossing bundles in world units.
const BUNDLE_HALF_WIDTH: f64 = 4.0;

/// Spatial frequency of the curl-noise preset.
const CURL_SCALE: f64 = 0.08;

/// Enumeration of the synthetic fields the CLI can track.
pub enum FieldPreset {
    /// A single direction along +x everywhere.
    Uniform(ConstantField),
    /// Two orthogonal bundles (x and y) crossing at the origin, as voxel peaks.
    Crossing(PeakGrid),
    /// Circulation around the z axis.
    Vortex(MaskedField),
    /// Smooth divergence-free curl-noise flow.
    Curl(MaskedField),
}

impl FieldPreset {
    /// Constructs a preset by name.
    ///
    /// Returns `TrackError::UnknownField` if the name is not recognized.
    pub fn from_name(name: &str, extent: f64, seed: u64) -> Result<Self, TrackError> {
        let domain = Self::domain(extent);
        match name {
            "uniform" => Ok(FieldPreset::Uniform(ConstantField::new(DVec3::X).within(domain))),
            "crossing" => {
                let n = (2.0 * extent).floor() as usize + 1;
                let mut grid = PeakGrid::new([n, n, n], domain.min, 1.0)?;
                grid.fill_with(|c| {
                    let mut peaks = Vec::new();
                    if c.y.abs() <= BUNDLE_HALF_WIDTH && c.z.abs() <= BUNDLE_HALF_WIDTH {
                        peaks.push((DVec3::X, 0.6));
                    }
                    if c.x.abs() <= BUNDLE_HALF_WIDTH && c.z.abs() <= BUNDLE_HALF_WIDTH {
                        peaks.push((DVec3::Y, 0.4));
                    }
                    peaks
                });
                Ok(FieldPreset::Crossing(grid))
            }
            "vortex" => Ok(FieldPreset::Vortex(MaskedField::new(
                Box::new(VortexField::new(DVec3::ZERO, DVec3::Z)),
                Box::new(domain),
            ))),
            "curl" => Ok(FieldPreset::Curl(MaskedField::new(
                Box::new(CurlNoiseField::new(CURL_SCALE, seed as u32)),
                Box::new(domain),
            ))),
            _ => Err(TrackError::UnknownField(name.to_string())),
        }
    }

    /// Returns a slice of all recognized preset names.
    pub fn list_fields() -> &'static [&'static str] {
        FIELD_NAMES
    }

    /// The cube every preset is defined on.
    pub fn domain(extent: f64) -> AxisBox {
        AxisBox::new(DVec3::splat(-extent), DVec3::splat(extent))
    }
}

impl FieldSampler for FieldPreset {
    fn samples(&self, position: DVec3) -> Vec<Sample> {
        match self {
            FieldPreset::Uniform(f) => f.samples(position),
            FieldPreset::Crossing(f) => f.samples(position),
            FieldPreset::Vortex(f) | FieldPreset::Curl(f) => f.samples(position),
        }
    }
}
