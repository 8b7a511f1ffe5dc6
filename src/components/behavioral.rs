//! Behavioral sources: the branch current or terminal voltage equals a
//! free-form expression of node voltages and branch currents.

use super::DeviceEquation;
use crate::error::Result;
use crate::expr::{Expr, Signal};

/// `i - f(...)`
pub(super) fn current(eq: &DeviceEquation<'_>, expr: &Expr<Signal>) -> Result<Expr<usize>> {
    Ok(eq.current() - eq.resolve(expr)?)
}

/// `(v+ - v-) - f(...)`
pub(super) fn voltage(eq: &DeviceEquation<'_>, expr: &Expr<Signal>) -> Result<Expr<usize>> {
    Ok(eq.terminal_voltage()? - eq.resolve(expr)?)
}
