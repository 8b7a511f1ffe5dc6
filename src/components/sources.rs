//! Independent voltage and current sources.
//!
//! The value is either an expression of time (DC level, pulse, sine) that
//! is evaluated at the time bound to the point being solved, or a value
//! pulled from the run's external source provider.

use super::DeviceEquation;
use crate::circuit::SourceValue;
use crate::error::Result;
use crate::expr::{Expr, ExternalKind};

/// `(v+ - v-) - V(t)`
pub(super) fn voltage_source(eq: &DeviceEquation<'_>, value: &SourceValue) -> Result<Expr<usize>> {
    let v = source_value(eq, value, ExternalKind::Voltage)?;
    Ok(eq.terminal_voltage()? - v)
}

/// `i - I(t)`
pub(super) fn current_source(eq: &DeviceEquation<'_>, value: &SourceValue) -> Result<Expr<usize>> {
    let i = source_value(eq, value, ExternalKind::Current)?;
    Ok(eq.current() - i)
}

fn source_value(
    eq: &DeviceEquation<'_>,
    value: &SourceValue,
    kind: ExternalKind,
) -> Result<Expr<usize>> {
    match value {
        SourceValue::Expr(expr) => eq.resolve(expr),
        SourceValue::External => Ok(Expr::External(kind, eq.branch.index)),
    }
}
