//! Transient strategy: fixed-step time marching.
//!
//! [`TransientRun`] is an explicit state machine carrying the last accepted
//! point across calls. Every step binds the same equation set to a new
//! time, step size and previous point; the equations themselves never
//! change during a run.

use tracing::{debug, trace, warn};

use crate::equations::EquationSet;
use crate::error::{Result, SimError, SolvePoint};
use crate::expr::{Binding, ExternalSources};

use super::config::TransientParams;
use super::newton::RootFinder;
use super::sink::{ResultSink, SolutionPoint, Trajectory};

/// A transient analysis in progress.
pub struct TransientRun<'a, R: RootFinder> {
    equations: &'a EquationSet,
    params: TransientParams,
    finder: R,
    sources: Option<&'a dyn ExternalSources>,
    sink: Option<&'a mut dyn ResultSink>,
    trajectory: Trajectory,
    /// Time and values of the last accepted point
    last: Option<(f64, Vec<f64>)>,
    /// Grid index of the next point to solve
    next_index: usize,
    /// Number of grid points after the initial one
    steps: usize,
}

impl<'a, R: RootFinder> TransientRun<'a, R> {
    /// Prepare a run. Configuration errors are reported here, before any
    /// point is solved.
    pub fn new(equations: &'a EquationSet, params: TransientParams, finder: R) -> Result<Self> {
        params.validate()?;
        let steps = params.step_count();
        Ok(Self {
            equations,
            trajectory: Trajectory::new(equations.layout()),
            params,
            finder,
            sources: None,
            sink: None,
            last: None,
            next_index: 0,
            steps,
        })
    }

    /// Supply values for externally driven sources.
    pub fn with_sources(mut self, sources: &'a dyn ExternalSources) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Push every accepted point to `sink`.
    pub fn with_sink(mut self, sink: &'a mut dyn ResultSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn params(&self) -> &TransientParams {
        &self.params
    }

    /// Number of accepted steps the run will produce after its first point.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    pub fn is_started(&self) -> bool {
        self.last.is_some()
    }

    /// True once every grid point has been solved or skipped.
    pub fn is_finished(&self) -> bool {
        self.is_started() && self.next_index > self.steps
    }

    /// Time of the next point to solve, if any remain.
    pub fn next_time(&self) -> Option<f64> {
        (self.next_index <= self.steps).then(|| self.params.time_at(self.next_index))
    }

    /// Points accepted so far.
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Solve the first point of the run from `seed`.
    ///
    /// Sources are evaluated at the run's start time. With initial
    /// conditions enabled a grounded capacitor lands on its `ic` bit for
    /// bit; across two non-reference nodes the difference of the solved
    /// voltages can differ from `ic` by an ulp of rounding.
    pub fn start(&mut self, seed: &[f64]) -> Result<&SolutionPoint> {
        if self.is_started() {
            return Err(SimError::invalid_param("transient run already started"));
        }

        let time = self.params.start;
        // No equation reads the previous point before the first one exists
        let prev = vec![0.0; self.equations.len()];
        let binding = Binding::start(&prev, time, self.params.step).with_sources(self.sources);
        self.equations.check_sources(&binding)?;

        debug!(
            start = self.params.start,
            stop = self.params.stop,
            step = self.params.step,
            steps = self.steps,
            uic = self.params.use_initial_conditions,
            "starting transient run"
        );
        let values =
            self.finder
                .find_root(self.equations, &binding, seed, SolvePoint::Initial { time })?;
        self.next_index = 1;
        Ok(self.accept(time, values))
    }

    /// Solve the next step seeded with the last accepted point.
    ///
    /// Returns `Ok(None)` once the run is finished. On error the run is left
    /// unchanged, so the caller may retry, skip or abort.
    pub fn advance(&mut self) -> Result<Option<&SolutionPoint>> {
        let seed = match &self.last {
            Some((_, values)) => values.clone(),
            None => return Err(SimError::invalid_param("transient run not started")),
        };
        self.solve_pending(&seed)
    }

    /// Retry the pending step from a caller-chosen seed.
    pub fn retry_with_seed(&mut self, seed: &[f64]) -> Result<Option<&SolutionPoint>> {
        if !self.is_started() {
            return Err(SimError::invalid_param("transient run not started"));
        }
        self.solve_pending(seed)
    }

    /// Drop the pending step without solving it. The following step is
    /// integrated from the last accepted point over the longer interval.
    pub fn skip(&mut self) {
        if !self.is_started() || self.is_finished() {
            return;
        }
        warn!(
            index = self.next_index,
            time = self.params.time_at(self.next_index),
            "skipping transient step"
        );
        self.next_index += 1;
    }

    /// Consume the run and return the accepted points.
    pub fn finish(self) -> Trajectory {
        self.trajectory
    }

    fn solve_pending(&mut self, seed: &[f64]) -> Result<Option<&SolutionPoint>> {
        if self.is_finished() {
            return Ok(None);
        }
        let Some((last_time, prev)) = &self.last else {
            return Err(SimError::invalid_param("transient run not started"));
        };

        let index = self.next_index;
        let time = self.params.time_at(index);
        let step = time - last_time;
        let binding = Binding::stepping(prev, time, step).with_sources(self.sources);

        let values =
            self.finder
                .find_root(self.equations, &binding, seed, SolvePoint::Step { index, time })?;
        trace!(index, time, "accepted transient step");

        self.next_index += 1;
        Ok(Some(self.accept(time, values)))
    }

    fn accept(&mut self, time: f64, values: Vec<f64>) -> &SolutionPoint {
        let point = SolutionPoint::at(time, values.clone());
        if let Some(sink) = self.sink.as_mut() {
            sink.push(&point, &self.trajectory.variables);
        }
        self.last = Some((time, values));
        self.trajectory.points.push(point);
        &self.trajectory.points[self.trajectory.points.len() - 1]
    }
}
