//! Operating-point strategy: a single steady-state solve.

use tracing::debug;

use crate::equations::EquationSet;
use crate::error::{Result, SolvePoint};
use crate::expr::{Binding, ExternalSources};

use super::newton::RootFinder;
use super::sink::{ResultSink, SolutionPoint};

/// Solve an operating-point equation set once.
///
/// Sources are evaluated at `t = 0`. The solved point is pushed to `sink`
/// (if any) before it is returned.
pub fn solve_operating_point<R: RootFinder + ?Sized>(
    equations: &EquationSet,
    finder: &mut R,
    seed: &[f64],
    sources: Option<&dyn ExternalSources>,
    sink: Option<&mut dyn ResultSink>,
) -> Result<SolutionPoint> {
    let prev = vec![0.0; equations.len()];
    let binding = Binding::start(&prev, 0.0, 0.0).with_sources(sources);
    equations.check_sources(&binding)?;

    debug!(unknowns = equations.len(), "solving operating point");
    let values = finder.find_root(equations, &binding, seed, SolvePoint::OperatingPoint)?;
    let point = SolutionPoint::operating_point(values);

    if let Some(sink) = sink {
        sink.push(&point, &equations.layout().variable_names());
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::components::Flavor;
    use crate::solver::{NewtonRaphson, Recorder};
    use approx::assert_relative_eq;

    fn solve(circuit: &Circuit) -> SolutionPoint {
        let set = EquationSet::synthesize(circuit, Flavor::OperatingPoint).unwrap();
        let seed = vec![1.0; set.len()];
        solve_operating_point(&set, &mut NewtonRaphson::new(), &seed, None, None).unwrap()
    }

    #[test]
    fn test_single_resistor() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "1", "0", 5.0);
        circuit.resistor("R1", "1", "0", 1e3);
        let point = solve(&circuit);
        // [V(1), i(0), i(1)]
        assert_relative_eq!(point.values[0], 5.0, epsilon = 1e-9);
        assert_relative_eq!(point.values[2], 5e-3, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitor_carries_no_current() {
        for c in [1e-12, 1e-6, 1.0, 0.0] {
            let mut circuit = Circuit::new();
            circuit.voltage_source("V1", "1", "0", 5.0);
            circuit.resistor("R1", "1", "2", 1e3);
            circuit.capacitor("C1", "2", "0", c);
            let point = solve(&circuit);
            // [V(1), V(2), i(0), i(1), i(2)]
            assert_relative_eq!(point.values[4], 0.0, epsilon = 1e-12);
            assert_relative_eq!(point.values[1], 5.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inductor_is_a_short() {
        for l in [1e-9, 1e-3, 10.0] {
            let mut circuit = Circuit::new();
            circuit.voltage_source("V1", "1", "0", 5.0);
            circuit.resistor("R1", "1", "2", 1e3);
            circuit.inductor("L1", "2", "3", l);
            circuit.resistor("R2", "3", "0", 1e3);
            let point = solve(&circuit);
            // [V(1), V(2), V(3), ...]
            assert_relative_eq!(point.values[1] - point.values[2], 0.0, epsilon = 1e-12);
            assert_relative_eq!(point.values[2], 2.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sink_receives_named_values() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "1", "0", 2.0);
        circuit.resistor("R1", "1", "0", 1.0);
        let set = EquationSet::synthesize(&circuit, Flavor::OperatingPoint).unwrap();
        let mut recorder = Recorder::new();
        solve_operating_point(
            &set,
            &mut NewtonRaphson::new(),
            &[1.0; 3],
            None,
            Some(&mut recorder),
        )
        .unwrap();
        assert_eq!(recorder.records.len(), 1);
        assert_relative_eq!(recorder.value(0, "V(1)").unwrap(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(recorder.value(0, "i(1)").unwrap(), 2.0, epsilon = 1e-9);
    }
}
