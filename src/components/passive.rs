//! Passive elements: Resistor, Capacitor, Inductor.
//!
//! Capacitors and inductors use the backward-difference companion law
//! multiplied through by `dt`, so a zero-valued element stays well defined:
//!   capacitor: i*dt - C*((v+ - v-) - (v+_prev - v-_prev)) = 0
//!   inductor:  (v+ - v-)*dt - L*(i - i_prev) = 0

use super::{DeviceEquation, Flavor};
use crate::error::Result;
use crate::expr::{Expr, Signal};

/// `(v+ - v-) - i*R`, memoryless in both flavors.
pub(super) fn resistor(eq: &DeviceEquation<'_>, resistance: &Expr<Signal>) -> Result<Expr<usize>> {
    let r = eq.resolve(resistance)?;
    Ok(eq.terminal_voltage()? - eq.current() * r)
}

pub(super) fn capacitor(
    eq: &DeviceEquation<'_>,
    capacitance: &Expr<Signal>,
    initial_condition: Option<f64>,
    flavor: Flavor,
) -> Result<Expr<usize>> {
    let use_initial_conditions = match flavor {
        // Open circuit
        Flavor::OperatingPoint => return Ok(eq.current() - Expr::Const(0.0)),
        Flavor::Transient {
            use_initial_conditions,
        } => use_initial_conditions,
    };

    let start = if use_initial_conditions {
        eq.terminal_voltage()? - Expr::Const(initial_condition.unwrap_or(0.0))
    } else {
        eq.current() - Expr::Const(0.0)
    };

    let c = eq.resolve(capacitance)?;
    let stepping =
        eq.current() * Expr::Step - c * (eq.terminal_voltage()? - eq.prev_terminal_voltage()?);

    Ok(Expr::phased(start, stepping))
}

pub(super) fn inductor(
    eq: &DeviceEquation<'_>,
    inductance: &Expr<Signal>,
    initial_condition: Option<f64>,
    flavor: Flavor,
) -> Result<Expr<usize>> {
    let use_initial_conditions = match flavor {
        // Short circuit
        Flavor::OperatingPoint => return eq.terminal_voltage(),
        Flavor::Transient {
            use_initial_conditions,
        } => use_initial_conditions,
    };

    let start = if use_initial_conditions {
        eq.current() - Expr::Const(initial_condition.unwrap_or(0.0))
    } else {
        eq.terminal_voltage()?
    };

    let l = eq.resolve(inductance)?;
    let stepping = eq.terminal_voltage()? * Expr::Step - l * (eq.current() - eq.prev_current());

    Ok(Expr::phased(start, stepping))
}
