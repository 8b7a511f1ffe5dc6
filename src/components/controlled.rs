//! Linear controlled sources.
//!
//! Voltage-output kinds (VCVS, CCVS) constrain `v+ - v-`, current-output
//! kinds (VCCS, CCCS) constrain the branch current. The law is identical in
//! every analysis flavor.

use super::DeviceEquation;
use crate::circuit::{CurrentSense, VoltageSense};
use crate::error::Result;
use crate::expr::Expr;

pub(super) fn vcvs(eq: &DeviceEquation<'_>, gain: f64, sense: &VoltageSense) -> Result<Expr<usize>> {
    let control = eq.voltage_between(&sense.plus, &sense.minus)?;
    Ok(eq.terminal_voltage()? - Expr::Const(gain) * control)
}

pub(super) fn vccs(eq: &DeviceEquation<'_>, gain: f64, sense: &VoltageSense) -> Result<Expr<usize>> {
    let control = eq.voltage_between(&sense.plus, &sense.minus)?;
    Ok(eq.current() - Expr::Const(gain) * control)
}

pub(super) fn ccvs(eq: &DeviceEquation<'_>, gain: f64, sense: &CurrentSense) -> Result<Expr<usize>> {
    let control = sensed_current(eq, sense);
    Ok(eq.terminal_voltage()? - Expr::Const(gain) * control)
}

pub(super) fn cccs(eq: &DeviceEquation<'_>, gain: f64, sense: &CurrentSense) -> Result<Expr<usize>> {
    let control = sensed_current(eq, sense);
    Ok(eq.current() - Expr::Const(gain) * control)
}

/// `i(plus)` or `i(plus) - i(minus)`.
fn sensed_current(eq: &DeviceEquation<'_>, sense: &CurrentSense) -> Expr<usize> {
    let plus = eq.layout.current(sense.plus);
    match sense.minus {
        Some(minus) => plus - eq.layout.current(minus),
        None => plus,
    }
}
