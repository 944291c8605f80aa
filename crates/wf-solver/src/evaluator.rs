//! The evaluation boundary used by calibration and search.

use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::thread;
use std::time::Duration;

use tracing::warn;
use wf_network::Network;

use crate::error::{SolverError, SolverResult};
use crate::result::{SimulationResult, Snapshot, TimeSelector};

/// Anything that can solve a network.
///
/// Implementations must be deterministic for a fixed network. Evaluations are
/// the dominant cost of every loop that calls them.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult>;
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult> {
        (**self).evaluate(network)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult> {
        (**self).evaluate(network)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult> {
        (**self).evaluate(network)
    }
}

/// Evaluate and keep only the step picked by `selector`.
pub fn evaluate_at<E: Evaluator + ?Sized>(
    evaluator: &E,
    network: &Network,
    selector: TimeSelector,
) -> SolverResult<Snapshot> {
    evaluator
        .evaluate(network)?
        .into_selected(selector)
        .ok_or_else(|| SolverError::Divergence {
            what: "evaluation produced no time steps".to_string(),
        })
}

/// Runs each evaluation on a worker thread with its own copy of the network.
///
/// An evaluation that outlives the limit is reported as
/// [`SolverError::Timeout`]; its thread is left to finish on its own.
pub struct TimeoutEvaluator<E> {
    inner: Arc<E>,
    limit: Duration,
}

impl<E: Evaluator + 'static> TimeoutEvaluator<E> {
    pub fn new(inner: E, limit: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<E: Evaluator + 'static> Evaluator for TimeoutEvaluator<E> {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult> {
        let (tx, rx) = channel();
        let inner = Arc::clone(&self.inner);
        let network = network.clone();

        thread::spawn(move || {
            let _ = tx.send(inner.evaluate(&network));
        });

        match rx.recv_timeout(self.limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(limit_s = self.limit.as_secs_f64(), "evaluation timed out");
                Err(SolverError::Timeout {
                    limit_s: self.limit.as_secs_f64(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(SolverError::Divergence {
                what: "evaluation worker stopped without a result".to_string(),
            }),
        }
    }
}
