//! Main simulator interface.

use tracing::info;

use crate::circuit::Circuit;
use crate::components::Flavor;
use crate::equations::EquationSet;
use crate::error::{Result, SimError};
use crate::expr::ExternalSources;

use super::config::{Analysis, SolverConfig};
use super::newton::{NewtonRaphson, RootFinder};
use super::operating_point::solve_operating_point;
use super::sink::{ResultSink, Trajectory};
use super::transient::TransientRun;

/// Runs one analysis of one circuit.
///
/// Sources and sinks are borrowed for the duration of the run only; nothing
/// is shared between runs, so independent simulators may run on separate
/// threads.
pub struct Simulator<'a> {
    circuit: &'a Circuit,
    analysis: Analysis,
    config: SolverConfig,
    sources: Option<&'a dyn ExternalSources>,
    sink: Option<&'a mut dyn ResultSink>,
    seed: Option<Vec<f64>>,
}

impl<'a> Simulator<'a> {
    /// Create a new simulator with default solver configuration.
    pub fn new(circuit: &'a Circuit, analysis: Analysis) -> Self {
        Self {
            circuit,
            analysis,
            config: SolverConfig::default(),
            sources: None,
            sink: None,
            seed: None,
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply values for externally driven sources.
    pub fn with_sources(mut self, sources: &'a dyn ExternalSources) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Push every solved point to `sink` as it is accepted.
    pub fn with_sink(mut self, sink: &'a mut dyn ResultSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Override the first solve's initial guess.
    pub fn with_seed(mut self, seed: Vec<f64>) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Run with the default Newton-Raphson root finder.
    pub fn run(self) -> Result<Trajectory> {
        let finder = NewtonRaphson::with_config(&self.config);
        self.run_with(finder)
    }

    /// Run with a caller-supplied root finder.
    ///
    /// Transient runs abort on the first failed step; drive a
    /// [`TransientRun`] directly for any other policy.
    pub fn run_with<R: RootFinder>(self, mut finder: R) -> Result<Trajectory> {
        self.config.validate()?;
        self.analysis.validate()?;

        let flavor = match &self.analysis {
            Analysis::OperatingPoint => Flavor::OperatingPoint,
            Analysis::Transient(params) => Flavor::Transient {
                use_initial_conditions: params.use_initial_conditions,
            },
        };
        let equations = EquationSet::synthesize(self.circuit, flavor)?;

        let n = equations.len();
        let seed = match self.seed {
            Some(seed) if seed.len() != n => {
                return Err(SimError::SeedLength {
                    expected: n,
                    found: seed.len(),
                })
            }
            Some(seed) => seed,
            None => vec![self.config.initial_guess; n],
        };

        info!(
            title = %self.circuit.title,
            analysis = self.analysis.plot_name(),
            unknowns = n,
            "running analysis"
        );

        match self.analysis {
            Analysis::OperatingPoint => {
                let point =
                    solve_operating_point(&equations, &mut finder, &seed, self.sources, self.sink)?;
                let mut trajectory = Trajectory::new(equations.layout());
                trajectory.points.push(point);
                Ok(trajectory)
            }
            Analysis::Transient(params) => {
                let mut run = TransientRun::new(&equations, params, finder)?;
                if let Some(sources) = self.sources {
                    run = run.with_sources(sources);
                }
                if let Some(sink) = self.sink {
                    run = run.with_sink(sink);
                }
                run.start(&seed)?;
                while run.advance()?.is_some() {}
                Ok(run.finish())
            }
        }
    }
}
