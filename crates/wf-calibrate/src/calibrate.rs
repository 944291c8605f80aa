//! Feedback loop: evaluate, check minimum pressure, raise source heads.

use tracing::{debug, info, warn};
use wf_core::{NodeId, Real, m};
use wf_network::{Network, SourceJunctionMap};
use wf_solver::{Evaluator, Snapshot, evaluate_at};

use crate::error::CalibrationResult;
use crate::policy::{CalibrationConfig, Targeting};
use crate::state::{CalibrationState, CalibrationStatus, IterationRecord};

/// Raise source heads until the minimum junction pressure reaches the target
/// or the iteration budget is spent.
///
/// Heads only ever increase. Once the target is met the network is left
/// untouched. A diverged evaluation counts as infeasible and triggers a
/// uniform `divergence_step_m` raise. An exhausted budget is a normal outcome
/// reported through [`CalibrationState::status`].
pub fn calibrate<E: Evaluator + ?Sized>(
    network: &mut Network,
    evaluator: &E,
    map: &SourceJunctionMap,
    config: &CalibrationConfig,
) -> CalibrationResult<CalibrationState> {
    config.validate()?;
    let mut state = CalibrationState::new(config.target_pressure_m);
    let all_sources: Vec<NodeId> = network.sources().map(|n| n.id).collect();
    for &source in &all_sources {
        if let Some(node) = network.node(source) {
            state.offsets.insert(node.name.clone(), 0.0);
        }
    }

    for iteration in 1..=config.max_iterations {
        state.iterations = iteration;

        let (min_pressure, step, targets) =
            match evaluate_at(evaluator, network, config.selector) {
                Ok(snapshot) => {
                    let Some(min) = snapshot.min_junction_pressure() else {
                        state.status = CalibrationStatus::Feasible;
                        state.history.push(IterationRecord {
                            iteration,
                            min_pressure: None,
                            step_m: 0.0,
                            adjusted: Vec::new(),
                        });
                        return Ok(state);
                    };
                    state.last_min_pressure = Some(min);
                    if min >= config.target_pressure_m {
                        info!(iteration, min_pressure = min, "calibration feasible");
                        state.status = CalibrationStatus::Feasible;
                        state.history.push(IterationRecord {
                            iteration,
                            min_pressure: Some(min),
                            step_m: 0.0,
                            adjusted: Vec::new(),
                        });
                        return Ok(state);
                    }

                    let step = config.step.step(config.target_pressure_m - min);
                    let targets = match config.targeting {
                        Targeting::Uniform => all_sources.clone(),
                        Targeting::LowestPressure { count } => {
                            let feeding = sources_feeding_lowest(&snapshot, map, count);
                            if feeding.is_empty() {
                                warn!(iteration, "no mapped source feeds any junction; nothing to raise");
                            }
                            feeding
                        }
                    };
                    (Some(min), step, targets)
                }
                Err(err) if err.is_divergence() => {
                    warn!(iteration, error = %err, "evaluation diverged");
                    state.divergences += 1;
                    (None, config.divergence_step_m, all_sources.clone())
                }
                Err(err) => return Err(err.into()),
            };

        debug!(iteration, ?min_pressure, step, sources = targets.len(), "calibration step");

        // The last evaluation is not followed by an adjustment, so the network
        // always matches the last reported pressure.
        if iteration == config.max_iterations {
            state.history.push(IterationRecord {
                iteration,
                min_pressure,
                step_m: 0.0,
                adjusted: Vec::new(),
            });
            break;
        }

        let adjusted = raise_heads(network, &targets, step, &mut state)?;
        if let Some(gain) = config.pump_gain {
            scale_pump_curves(network, gain);
        }
        state.history.push(IterationRecord {
            iteration,
            min_pressure,
            step_m: step,
            adjusted,
        });
    }

    warn!(
        iterations = state.iterations,
        last_min_pressure = ?state.last_min_pressure,
        "calibration budget exhausted"
    );
    state.status = CalibrationStatus::Exhausted;
    Ok(state)
}

/// Mapped sources feeding the `count` lowest-pressure junctions. When none of
/// them has a mapped feeder the window widens, in pressure order, until one
/// does. Unmapped sources are never returned.
fn sources_feeding_lowest(snapshot: &Snapshot, map: &SourceJunctionMap, count: usize) -> Vec<NodeId> {
    let ordered: Vec<NodeId> = snapshot
        .lowest_pressure_junctions(usize::MAX)
        .iter()
        .map(|n| n.id)
        .collect();
    let mut window = count.min(ordered.len());
    loop {
        let feeding: Vec<NodeId> = map.sources_feeding(&ordered[..window]).collect();
        if !feeding.is_empty() || window == ordered.len() {
            return feeding;
        }
        window += 1;
    }
}

fn raise_heads(
    network: &mut Network,
    sources: &[NodeId],
    step: Real,
    state: &mut CalibrationState,
) -> CalibrationResult<Vec<String>> {
    let mut adjusted = Vec::with_capacity(sources.len());
    for &source in sources {
        let Some(head) = network.source_head(source) else {
            continue;
        };
        network.set_source_head(source, head + m(step))?;
        if let Some(node) = network.node(source) {
            *state.offsets.entry(node.name.clone()).or_insert(0.0) += step;
            adjusted.push(node.name.clone());
        }
    }
    Ok(adjusted)
}

/// Multiply every pump head curve's head values by `gain`.
pub fn scale_pump_curves(network: &mut Network, gain: Real) {
    for name in network.pump_curve_names() {
        if let Some(curve) = network.curve_mut(&name) {
            for point in &mut curve.points {
                point.y *= gain;
            }
        }
    }
}
