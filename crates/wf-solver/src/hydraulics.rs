//! Link headloss relations in SI units (flow m3/s, head m).
//!
//! Every relation returns the headloss from the first to the second endpoint
//! and its derivative with respect to flow. Pumps return a negative loss.

use std::f64::consts::PI;

use wf_core::Real;
use wf_core::constants::{G0_MPS2, GAMMA_WATER};
use wf_network::{CurvePoint, HeadlossModel, LinkData, Network, PumpDrive};

use crate::error::{SolverError, SolverResult};

/// `8 / (pi^2 g)`, the velocity-head coefficient of a circular section.
const VELOCITY_HEAD: Real = 8.0 / (PI * PI * G0_MPS2);
/// Resistance of a closed check valve.
const CLOSED_RESISTANCE: Real = 1e8;
/// Lowest flow used to evaluate a constant-power pump.
const MIN_POWER_PUMP_FLOW: Real = 1e-4;

/// Compiled relation of one link.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkModel {
    /// `h = r |q|^(n-1) q + m |q| q`
    Power { r: Real, n: Real, minor: Real },
    /// Darcy-Weisbach with a Swamee-Jain friction factor.
    Darcy {
        length: Real,
        diameter: Real,
        roughness: Real,
        minor: Real,
    },
    /// Head gain `h0 - r q^c`.
    PumpCurve { h0: Real, r: Real, c: Real },
    /// Constant shaft power (W).
    PumpPower { power: Real },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledLink {
    pub model: LinkModel,
    pub check_valve: bool,
    /// Starting flow for the iteration.
    pub initial_flow: Real,
}

fn minor_coefficient(k: Real, diameter: Real) -> Real {
    VELOCITY_HEAD * k / diameter.powi(4)
}

fn area(diameter: Real) -> Real {
    PI * diameter * diameter / 4.0
}

/// Build the relation of a link from its data and the network options.
pub(crate) fn compile_link(network: &Network, data: &LinkData) -> SolverResult<CompiledLink> {
    match data {
        LinkData::Pipe {
            length,
            diameter,
            roughness,
            minor_loss,
            check_valve,
        } => {
            let (l, d) = (length.value, diameter.value);
            if !(l > 0.0 && d > 0.0 && *roughness > 0.0) {
                return Err(SolverError::Setup {
                    what: format!("pipe with length {l}, diameter {d}, roughness {roughness}"),
                });
            }
            let minor = minor_coefficient(*minor_loss, d);
            let model = match network.options().headloss {
                HeadlossModel::HazenWilliams => LinkModel::Power {
                    r: 10.667 * l / (roughness.powf(1.852) * d.powf(4.871)),
                    n: 1.852,
                    minor,
                },
                HeadlossModel::ChezyManning => LinkModel::Power {
                    r: 10.294 * roughness * roughness * l / d.powf(5.333),
                    n: 2.0,
                    minor,
                },
                HeadlossModel::DarcyWeisbach => LinkModel::Darcy {
                    length: l,
                    diameter: d,
                    roughness: roughness / 1_000.0,
                    minor,
                },
            };
            Ok(CompiledLink {
                model,
                check_valve: *check_valve,
                initial_flow: area(d) * 0.3048,
            })
        }
        LinkData::Valve {
            diameter,
            minor_loss,
            ..
        } => {
            let d = diameter.value;
            if d <= 0.0 {
                return Err(SolverError::Setup {
                    what: format!("valve with diameter {d}"),
                });
            }
            Ok(CompiledLink {
                model: LinkModel::Power {
                    r: 0.0,
                    n: 2.0,
                    minor: minor_coefficient(*minor_loss, d),
                },
                check_valve: false,
                initial_flow: area(d) * 0.3048,
            })
        }
        LinkData::Pump {
            drive: PumpDrive::Head { curve },
        } => {
            let points = &network
                .curve(curve)
                .ok_or_else(|| SolverError::Setup {
                    what: format!("missing pump curve '{curve}'"),
                })?
                .points;
            let (h0, r, c) = fit_head_curve(points)?;
            let design = points
                .get(points.len() / 2)
                .map(|p| p.x)
                .filter(|&x| x > 0.0)
                .unwrap_or(0.01);
            Ok(CompiledLink {
                model: LinkModel::PumpCurve { h0, r, c },
                check_valve: false,
                initial_flow: design,
            })
        }
        LinkData::Pump {
            drive: PumpDrive::Power { power },
        } => {
            if power.value <= 0.0 {
                return Err(SolverError::Setup {
                    what: "pump with non-positive power".to_string(),
                });
            }
            Ok(CompiledLink {
                model: LinkModel::PumpPower { power: power.value },
                check_valve: false,
                initial_flow: 0.01,
            })
        }
    }
}

/// Fit `h = h0 - r q^c` to a pump head curve.
///
/// One point `(q1, h1)`: shutoff head `4/3 h1`, exponent 2. Three points with a
/// zero-flow first point: power law through all three. Anything else: a
/// quadratic through the first and last points.
pub fn fit_head_curve(points: &[CurvePoint]) -> SolverResult<(Real, Real, Real)> {
    let bad = |what: &str| SolverError::Setup {
        what: format!("pump curve: {what}"),
    };
    match points {
        [] => Err(bad("no points")),
        [p] => {
            if !(p.x > 0.0 && p.y > 0.0) {
                return Err(bad("design point must be positive"));
            }
            let h0 = 4.0 / 3.0 * p.y;
            Ok((h0, (h0 - p.y) / (p.x * p.x), 2.0))
        }
        [p0, p1, p2] if p0.x == 0.0 && p0.y > p1.y && p1.y > p2.y && p2.x > p1.x && p1.x > 0.0 => {
            let h0 = p0.y;
            let c = ((h0 - p2.y) / (h0 - p1.y)).ln() / (p2.x / p1.x).ln();
            let r = (h0 - p1.y) / p1.x.powf(c);
            if !(c.is_finite() && r.is_finite() && c > 0.0 && r > 0.0) {
                return Err(bad("three-point fit failed"));
            }
            Ok((h0, r, c))
        }
        [first, .., last] => {
            let denom = last.x * last.x - first.x * first.x;
            let r = (first.y - last.y) / denom;
            if !(denom > 0.0 && r > 0.0 && r.is_finite()) {
                return Err(bad("head must fall as flow rises"));
            }
            Ok((first.y + r * first.x * first.x, r, 2.0))
        }
    }
}

impl CompiledLink {
    /// Headloss and its flow derivative, derivative bounded below by `min_gradient`.
    pub(crate) fn headloss(&self, q: Real, viscosity: Real, min_gradient: Real) -> (Real, Real) {
        if self.check_valve && q < 0.0 {
            return (CLOSED_RESISTANCE * q, CLOSED_RESISTANCE);
        }
        let (h, g) = match &self.model {
            LinkModel::Power { r, n, minor } => {
                let aq = q.abs();
                let friction = r * aq.powf(n - 1.0);
                (
                    friction * q + minor * aq * q,
                    n * friction + 2.0 * minor * aq,
                )
            }
            LinkModel::Darcy {
                length,
                diameter,
                roughness,
                minor,
            } => {
                let aq = q.abs();
                let f = friction_factor(aq, *diameter, *roughness, viscosity);
                let r = VELOCITY_HEAD * f * length / diameter.powi(5) + minor;
                (r * aq * q, 2.0 * r * aq)
            }
            LinkModel::PumpCurve { h0, r, c } => {
                let q = q.max(0.0);
                (-(h0 - r * q.powf(*c)), c * r * q.powf(c - 1.0))
            }
            LinkModel::PumpPower { power } => {
                let q = q.max(MIN_POWER_PUMP_FLOW);
                (-power / (GAMMA_WATER * q), power / (GAMMA_WATER * q * q))
            }
        };
        (h, g.max(min_gradient))
    }

    pub(crate) fn is_pump(&self) -> bool {
        matches!(
            self.model,
            LinkModel::PumpCurve { .. } | LinkModel::PumpPower { .. }
        )
    }
}

/// Darcy friction factor: laminar below Re 2000, Swamee-Jain above.
fn friction_factor(q_abs: Real, diameter: Real, roughness: Real, viscosity: Real) -> Real {
    let reynolds = 4.0 * q_abs / (PI * diameter * viscosity);
    if reynolds < 1.0 {
        return 64.0;
    }
    if reynolds < 2_000.0 {
        return 64.0 / reynolds;
    }
    let a = roughness / diameter / 3.7;
    let b = 5.74 / reynolds.powf(0.9);
    (0.25 / (a + b).log10().powi(2)).max(1e-4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: Real, y: Real) -> CurvePoint {
        CurvePoint { x, y, line: None }
    }

    #[test]
    fn single_point_curve() {
        let (h0, r, c) = fit_head_curve(&[pt(0.02, 30.0)]).unwrap();
        assert!((h0 - 40.0).abs() < 1e-12);
        assert!((c - 2.0).abs() < 1e-12);
        assert!((h0 - r * 0.02_f64.powi(2) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn three_point_curve_passes_through_points() {
        let pts = [pt(0.0, 50.0), pt(0.02, 40.0), pt(0.04, 20.0)];
        let (h0, r, c) = fit_head_curve(&pts).unwrap();
        for p in &pts {
            assert!((h0 - r * p.x.powf(c) - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn rising_curve_is_rejected() {
        assert!(fit_head_curve(&[pt(0.0, 10.0), pt(0.05, 30.0)]).is_err());
        assert!(fit_head_curve(&[]).is_err());
    }

    #[test]
    fn hazen_williams_is_odd_and_increasing() {
        let link = CompiledLink {
            model: LinkModel::Power {
                r: 10.667 * 1000.0 / (130.0_f64.powf(1.852) * 0.3_f64.powf(4.871)),
                n: 1.852,
                minor: 0.0,
            },
            check_valve: false,
            initial_flow: 0.0,
        };
        let (h1, g1) = link.headloss(0.05, 1e-6, 1e-7);
        let (h2, _) = link.headloss(-0.05, 1e-6, 1e-7);
        let (h3, _) = link.headloss(0.06, 1e-6, 1e-7);
        assert!(h1 > 0.0 && (h1 + h2).abs() < 1e-12 && h3 > h1);
        assert!((g1 - 1.852 * h1 / 0.05).abs() < 1e-9);
    }

    #[test]
    fn check_valve_blocks_reverse_flow() {
        let link = CompiledLink {
            model: LinkModel::Power {
                r: 1.0,
                n: 2.0,
                minor: 0.0,
            },
            check_valve: true,
            initial_flow: 0.0,
        };
        let (_, g) = link.headloss(-0.01, 1e-6, 1e-7);
        assert_eq!(g, CLOSED_RESISTANCE);
    }
}
