//! Device equation library.
//!
//! Every element kind contributes exactly one equation whose root expresses
//! its constitutive law, in terms of the unknown-vector slots fixed by a
//! [`Layout`]:
//! - Passive: Resistor, Capacitor, Inductor
//! - Sources: independent voltage and current sources (constant,
//!   waveform or externally supplied)
//! - Controlled: VCVS, VCCS, CCVS, CCCS
//! - Behavioral: current and voltage sources defined by an expression
//!
//! Reactive elements carry two forms in a transient analysis: the first
//! point of the run and the backward-difference companion law used for
//! every later step. Both are packed into one [`Expr::Phased`] node so the
//! equation set is built once per run.

mod behavioral;
mod controlled;
mod passive;
mod sources;

use crate::circuit::{Branch, Element, Layout};
use crate::error::Result;
use crate::expr::{Expr, Signal};

/// Which form of the device laws to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Steady state: capacitors open, inductors shorted
    OperatingPoint,
    /// Time-stepped; `use_initial_conditions` selects how the first point
    /// treats reactive elements
    Transient { use_initial_conditions: bool },
}

impl Flavor {
    pub fn is_transient(&self) -> bool {
        matches!(self, Flavor::Transient { .. })
    }
}

/// Build the device equation of one branch.
pub fn device_equation(branch: &Branch, layout: &Layout, flavor: Flavor) -> Result<Expr<usize>> {
    let eq = DeviceEquation::new(branch, layout);
    match &branch.element {
        Element::Resistor { resistance } => passive::resistor(&eq, resistance),
        Element::Capacitor {
            capacitance,
            initial_condition,
        } => passive::capacitor(&eq, capacitance, *initial_condition, flavor),
        Element::Inductor {
            inductance,
            initial_condition,
        } => passive::inductor(&eq, inductance, *initial_condition, flavor),
        Element::VoltageSource { value } => sources::voltage_source(&eq, value),
        Element::CurrentSource { value } => sources::current_source(&eq, value),
        Element::Vcvs { gain, sense } => controlled::vcvs(&eq, *gain, sense),
        Element::Vccs { gain, sense } => controlled::vccs(&eq, *gain, sense),
        Element::Ccvs { gain, sense } => controlled::ccvs(&eq, *gain, sense),
        Element::Cccs { gain, sense } => controlled::cccs(&eq, *gain, sense),
        Element::BehavioralCurrent { expr } => behavioral::current(&eq, expr),
        Element::BehavioralVoltage { expr } => behavioral::voltage(&eq, expr),
    }
}

/// Slot accessors for one branch, shared by every device builder.
pub(crate) struct DeviceEquation<'a> {
    pub branch: &'a Branch,
    pub layout: &'a Layout,
}

impl<'a> DeviceEquation<'a> {
    fn new(branch: &'a Branch, layout: &'a Layout) -> Self {
        Self { branch, layout }
    }

    /// `v+ - v-` at the point being solved.
    fn terminal_voltage(&self) -> Result<Expr<usize>> {
        Ok(self.layout.voltage(&self.branch.name, &self.branch.plus)?
            - self.layout.voltage(&self.branch.name, &self.branch.minus)?)
    }

    /// `v+ - v-` at the previously accepted point.
    fn prev_terminal_voltage(&self) -> Result<Expr<usize>> {
        Ok(self.layout.prev_voltage(&self.branch.name, &self.branch.plus)?
            - self.layout.prev_voltage(&self.branch.name, &self.branch.minus)?)
    }

    /// Voltage between two arbitrary nodes.
    fn voltage_between(&self, plus: &str, minus: &str) -> Result<Expr<usize>> {
        Ok(self.layout.voltage(&self.branch.name, plus)?
            - self.layout.voltage(&self.branch.name, minus)?)
    }

    /// Branch current at the point being solved.
    fn current(&self) -> Expr<usize> {
        self.layout.current(self.branch.index)
    }

    fn prev_current(&self) -> Expr<usize> {
        self.layout.prev_current(self.branch.index)
    }

    /// Resolve a netlist-level value expression.
    fn resolve(&self, expr: &Expr<Signal>) -> Result<Expr<usize>> {
        self.layout.resolve(&self.branch.name, expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{BranchId, Circuit, CurrentSense, SourceValue, VoltageSense};
    use crate::expr::{Binding, ExternalKind, Pulse};
    use approx::assert_relative_eq;

    fn eval(circuit: &Circuit, index: usize, flavor: Flavor, x: &[f64], b: &Binding<'_>) -> f64 {
        let layout = Layout::new(circuit);
        device_equation(&circuit.branches[index], &layout, flavor)
            .unwrap()
            .eval(x, b)
    }

    #[test]
    fn test_resistor_law() {
        let mut circuit = Circuit::new();
        circuit.resistor("R1", "a", "0", 100.0);
        // [V(a), i(0)]
        let prev = [0.0; 2];
        let b = Binding::start(&prev, 0.0, 0.0);
        let r = eval(&circuit, 0, Flavor::OperatingPoint, &[5.0, 0.05], &b);
        assert_relative_eq!(r, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitor_is_open_at_operating_point() {
        let mut circuit = Circuit::new();
        circuit.capacitor("C1", "a", "0", 1e-6);
        let prev = [0.0; 2];
        let b = Binding::start(&prev, 0.0, 0.0);
        // Residual is the branch current alone, whatever the voltage
        assert_eq!(eval(&circuit, 0, Flavor::OperatingPoint, &[7.0, 0.25], &b), 0.25);
    }

    #[test]
    fn test_capacitor_transient_forms() {
        let mut circuit = Circuit::new();
        circuit.add_branch(
            "C1",
            "a",
            "0",
            Element::capacitor(1e-3).with_initial_condition(2.0),
        );
        let uic = Flavor::Transient {
            use_initial_conditions: true,
        };
        let prev = [1.0, 0.0];

        let start = Binding::start(&prev, 0.0, 1e-3);
        assert_eq!(eval(&circuit, 0, uic, &[2.0, 9.0], &start), 0.0);

        // i*dt - C*(v - v_prev)
        let step = Binding::stepping(&prev, 1e-3, 1e-3);
        let r = eval(&circuit, 0, uic, &[3.0, 2.0], &step);
        assert_relative_eq!(r, 2.0 * 1e-3 - 1e-3 * 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_inductor_forms() {
        let mut circuit = Circuit::new();
        circuit.inductor("L1", "a", "0", 2.0);
        let prev = [0.0, 1.0];

        let b = Binding::start(&prev, 0.0, 0.0);
        assert_eq!(eval(&circuit, 0, Flavor::OperatingPoint, &[3.0, 5.0], &b), 3.0);

        // Missing ic means 0
        let uic = Flavor::Transient {
            use_initial_conditions: true,
        };
        assert_eq!(eval(&circuit, 0, uic, &[3.0, 5.0], &b), 5.0);

        let step = Binding::stepping(&prev, 0.1, 0.1);
        let r = eval(&circuit, 0, uic, &[3.0, 2.0], &step);
        assert_relative_eq!(r, 3.0 * 0.1 - 2.0 * (2.0 - 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_waveform_source_reads_time() {
        let mut circuit = Circuit::new();
        circuit.add_branch(
            "V1",
            "a",
            "0",
            Element::voltage_source(Expr::Pulse(Pulse::new(0.0, 5.0, 0.0, 1.0, 1.0, 1.0, 0.0))),
        );
        let prev = [0.0; 2];
        let b = Binding::stepping(&prev, 0.5, 0.5);
        // v - V(t) with V(0.5) = 2.5
        assert_relative_eq!(eval(&circuit, 0, Flavor::OperatingPoint, &[2.5, 0.0], &b), 0.0);
    }

    #[test]
    fn test_external_source_equation() {
        let mut circuit = Circuit::new();
        circuit.add_branch("I1", "a", "0", Element::current_source(SourceValue::External));
        let layout = Layout::new(&circuit);
        let eq = device_equation(&circuit.branches[0], &layout, Flavor::OperatingPoint).unwrap();
        assert!(eq.uses_external());
        assert_eq!(
            eq,
            Expr::Var(1) - Expr::External(ExternalKind::Current, BranchId(0))
        );
    }

    #[test]
    fn test_controlled_sources() {
        let mut circuit = Circuit::new();
        circuit.voltage_source("V1", "in", "0", 1.0);
        circuit.add_branch(
            "E1",
            "out",
            "0",
            Element::Vcvs {
                gain: 10.0,
                sense: VoltageSense::new("in", "0"),
            },
        );
        circuit.add_branch(
            "F1",
            "out",
            "0",
            Element::Cccs {
                gain: 2.0,
                sense: CurrentSense::single(BranchId(0)),
            },
        );
        // [V(in), V(out), i(0), i(1), i(2)]
        let x = [1.0, 10.0, 0.5, 0.0, 1.0];
        let prev = [0.0; 5];
        let b = Binding::start(&prev, 0.0, 0.0);
        assert_eq!(eval(&circuit, 1, Flavor::OperatingPoint, &x, &b), 0.0);
        assert_eq!(eval(&circuit, 2, Flavor::OperatingPoint, &x, &b), 0.0);
    }
}
