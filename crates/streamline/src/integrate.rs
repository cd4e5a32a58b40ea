//! One-step integration schemes.

use crate::select::Selector;
use fibertrace_core::{DVec3, Sample, Xorshift64};

/// Numerical scheme used to advance a sample by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrator {
    Euler,
    RungeKutta4,
}

impl Integrator {
    /// Advances `input` by one step, or returns `None` when no candidate survives.
    ///
    /// Runge-Kutta falls back to an Euler step when one of its stages is
    /// empty; an empty final position ends the step. The stop-region gate is
    /// applied by the tracker on top of this.
    pub fn advance(
        self,
        selector: &Selector<'_>,
        input: &Sample,
        reverse: bool,
        rng: &mut Xorshift64,
    ) -> Option<Sample> {
        match self {
            Integrator::Euler => euler(selector, input, reverse, rng),
            Integrator::RungeKutta4 => match runge_kutta4(selector, input, reverse, rng) {
                Some(sum) => {
                    let direction = sum.try_normalize()?;
                    let step = selector.config().step;
                    selector.select(input.position + step * direction, direction, reverse, rng)
                }
                None => euler(selector, input, reverse, rng),
            },
        }
    }
}

/// Perturbs `dir` with isotropic Gaussian noise and renormalizes.
fn disperse(dir: DVec3, sigma: f64, rng: &mut Xorshift64) -> DVec3 {
    if sigma <= 0.0 {
        return dir;
    }
    (dir + rng.next_gaussian_vec3() * sigma)
        .try_normalize()
        .unwrap_or(dir)
}

fn euler(
    selector: &Selector<'_>,
    input: &Sample,
    reverse: bool,
    rng: &mut Xorshift64,
) -> Option<Sample> {
    let config = selector.config();
    let dir = disperse(input.orientation, config.dispersion, rng);
    selector.select(input.position + config.step * dir, dir, reverse, rng)
}

/// Weighted stage sum of the classic four-stage scheme, or `None` if any
/// stage finds no candidate.
///
/// Stages two to four reference the first stage direction.
fn runge_kutta4(
    selector: &Selector<'_>,
    input: &Sample,
    reverse: bool,
    rng: &mut Xorshift64,
) -> Option<DVec3> {
    let step = selector.config().step;
    let pos = input.position;

    let v1 = selector
        .select(pos, input.orientation, reverse, rng)?
        .orientation;
    let v2 = selector
        .select(pos + 0.5 * step * v1, v1, reverse, rng)?
        .orientation;
    let v3 = selector
        .select(pos + 0.5 * step * v2, v1, reverse, rng)?
        .orientation;
    let v4 = selector
        .select(pos + step * v3, v1, reverse, rng)?
        .orientation;

    Some((v1 + 2.0 * v2 + 2.0 * v3 + v4) / 6.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use fibertrace_core::field_source::{ConstantField, VortexField};

    #[test]
    fn euler_moves_one_step_along_field() {
        let config = TrackConfig {
            step: 0.5,
            ..Default::default()
        };
        let field = ConstantField::new(DVec3::X);
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let next = Integrator::Euler
            .advance(&sel, &start, false, &mut Xorshift64::new(1))
            .unwrap();
        assert_eq!(next.position, DVec3::new(0.5, 0.0, 0.0));
        assert_eq!(next.orientation, DVec3::X);
    }

    #[test]
    fn dispersion_keeps_orientation_unit() {
        let mut rng = Xorshift64::new(12);
        for _ in 0..500 {
            let d = disperse(DVec3::Z, 0.3, &mut rng);
            assert!((d.length() - 1.0).abs() < 1e-12);
        }
        assert_eq!(disperse(DVec3::Z, 0.0, &mut rng), DVec3::Z);
    }

    #[test]
    fn dispersion_spreads_euler_steps() {
        let config = TrackConfig {
            dispersion: 0.2,
            angle: 90.0,
            ..Default::default()
        };
        let field = |p: DVec3| {
            vec![Sample::new(p, DVec3::X)]
        };
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let mut rng = Xorshift64::new(3);
        let off_axis = (0..50)
            .filter_map(|_| Integrator::Euler.advance(&sel, &start, false, &mut rng))
            .filter(|s| s.position.y.abs() > 1e-9)
            .count();
        assert_eq!(off_axis, 50);
    }

    #[test]
    fn runge_kutta_tracks_circles_better_than_euler() {
        let config = TrackConfig {
            step: 0.1,
            ..Default::default()
        };
        let field = VortexField::new(DVec3::ZERO, DVec3::Z);
        let sel = Selector::new(&config, &field, None, None);
        let drift = |scheme: Integrator| {
            let mut rng = Xorshift64::new(1);
            let mut s = Sample::new(DVec3::X, DVec3::Y);
            for _ in 0..60 {
                s = scheme.advance(&sel, &s, false, &mut rng).unwrap();
            }
            (s.position.length() - 1.0).abs()
        };
        let euler = drift(Integrator::Euler);
        let rk4 = drift(Integrator::RungeKutta4);
        assert!(euler > 0.1, "euler drift = {euler}");
        assert!(rk4 < 0.01, "rk4 drift = {rk4}");
    }

    #[test]
    fn runge_kutta_falls_back_to_euler_when_a_stage_is_empty() {
        let config = TrackConfig::default();
        // Candidates only exist at whole-number x, so the half-step stage fails.
        let field = |p: DVec3| {
            if (p.x - p.x.round()).abs() < 1e-9 {
                vec![Sample::new(p, DVec3::X)]
            } else {
                Vec::new()
            }
        };
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let mut rng = Xorshift64::new(1);
        assert!(runge_kutta4(&sel, &start, false, &mut rng).is_none());
        let next = Integrator::RungeKutta4
            .advance(&sel, &start, false, &mut rng)
            .unwrap();
        assert_eq!(next.position, DVec3::X);
    }

    #[test]
    fn runge_kutta_ends_when_only_the_final_position_is_empty() {
        let config = TrackConfig {
            angle: 90.0,
            ..Default::default()
        };
        let diagonal = DVec3::new(1.0, 1.0, 0.0).normalize();
        // +x before x = 0.25, diagonal after; no candidates in the band the
        // combined step lands in (y ~ 0.615).
        let field = move |p: DVec3| {
            if (0.55..0.68).contains(&p.y) {
                Vec::new()
            } else if p.x < 0.25 {
                vec![Sample::new(p, DVec3::X)]
            } else {
                vec![Sample::new(p, diagonal)]
            }
        };
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let mut rng = Xorshift64::new(1);

        let direction = runge_kutta4(&sel, &start, false, &mut rng)
            .unwrap()
            .normalize();
        assert!((0.55..0.68).contains(&direction.y), "direction = {direction}");
        assert!(Integrator::RungeKutta4
            .advance(&sel, &start, false, &mut rng)
            .is_none());
        // The Euler step from the same sample is still available.
        assert!(Integrator::Euler
            .advance(&sel, &start, false, &mut rng)
            .is_some());
    }

    #[test]
    fn runge_kutta_stages_reference_the_first_direction() {
        let config = TrackConfig {
            angle: 90.0,
            ..Default::default()
        };
        let diagonal = DVec3::new(1.0, 1.0, 0.0).normalize();
        let steep = DVec3::new(0.2, 1.0, 0.0).normalize();
        // Stage one sees +x, stage two the diagonal, later stages a choice
        // between +x (closest to stage one) and a steep direction (closest
        // to the diagonal).
        let field = move |p: DVec3| {
            if p.y.abs() < 1e-9 && p.x < 0.25 {
                vec![Sample::new(p, DVec3::X)]
            } else if p.y.abs() < 1e-9 && p.x < 0.75 {
                vec![Sample::new(p, diagonal)]
            } else {
                vec![Sample::new(p, DVec3::X), Sample::new(p, steep)]
            }
        };
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let next = Integrator::RungeKutta4
            .advance(&sel, &start, false, &mut Xorshift64::new(1))
            .unwrap();

        // v1 = v3 = v4 = +x and v2 = diagonal.
        let expected = (4.0 * DVec3::X + 2.0 * diagonal).normalize();
        assert!(
            (next.position - expected).length() < 1e-12,
            "position = {}",
            next.position
        );
        assert_eq!(next.orientation, DVec3::X);
    }

    #[test]
    fn empty_field_ends_both_schemes() {
        let config = TrackConfig::default();
        let field = ConstantField::empty();
        let sel = Selector::new(&config, &field, None, None);
        let start = Sample::new(DVec3::ZERO, DVec3::X);
        let mut rng = Xorshift64::new(1);
        assert!(Integrator::Euler.advance(&sel, &start, false, &mut rng).is_none());
        assert!(Integrator::RungeKutta4.advance(&sel, &start, false, &mut rng).is_none());
    }
}
