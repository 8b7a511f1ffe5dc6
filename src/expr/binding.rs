//! Evaluation context for resolved expressions.

use std::fmt;

use crate::circuit::BranchId;

/// Which half of a transient equation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Solving the first point of a run (or an operating point)
    Start,
    /// Solving an accepted step after the first point
    Stepping,
}

/// Kind of value requested from an external source provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Voltage,
    Current,
}

impl fmt::Display for ExternalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalKind::Voltage => write!(f, "vsrc"),
            ExternalKind::Current => write!(f, "isrc"),
        }
    }
}

/// Caller-supplied source values, queried by branch and time.
pub trait ExternalSources {
    /// Voltage of an external voltage source at time `t`.
    fn voltage(&self, branch: BranchId, t: f64) -> f64;

    /// Current of an external current source at time `t`.
    fn current(&self, branch: BranchId, t: f64) -> f64;
}

/// Adapter turning a pair of closures into [`ExternalSources`].
pub struct FnSources<V, I> {
    voltage: V,
    current: I,
}

impl<V, I> FnSources<V, I>
where
    V: Fn(BranchId, f64) -> f64,
    I: Fn(BranchId, f64) -> f64,
{
    pub fn new(voltage: V, current: I) -> Self {
        Self { voltage, current }
    }
}

impl<V, I> ExternalSources for FnSources<V, I>
where
    V: Fn(BranchId, f64) -> f64,
    I: Fn(BranchId, f64) -> f64,
{
    fn voltage(&self, branch: BranchId, t: f64) -> f64 {
        (self.voltage)(branch, t)
    }

    fn current(&self, branch: BranchId, t: f64) -> f64 {
        (self.current)(branch, t)
    }
}

/// Everything an equation reads besides the unknowns themselves.
#[derive(Clone, Copy)]
pub struct Binding<'a> {
    /// Solution at the previously accepted point
    pub prev: &'a [f64],
    /// Time of the point being solved
    pub time: f64,
    /// Distance to the previously accepted point
    pub step: f64,
    pub phase: Phase,
    pub sources: Option<&'a dyn ExternalSources>,
}

impl<'a> Binding<'a> {
    /// Binding for the first point of a run.
    pub fn start(prev: &'a [f64], time: f64, step: f64) -> Self {
        Self {
            prev,
            time,
            step,
            phase: Phase::Start,
            sources: None,
        }
    }

    /// Binding for a step after the first point.
    pub fn stepping(prev: &'a [f64], time: f64, step: f64) -> Self {
        Self {
            prev,
            time,
            step,
            phase: Phase::Stepping,
            sources: None,
        }
    }

    pub fn with_sources(mut self, sources: Option<&'a dyn ExternalSources>) -> Self {
        self.sources = sources;
        self
    }

    /// Query the external provider. Without one the value is NaN; synthesis
    /// rejects circuits with external sources before a provider-less run.
    pub fn external(&self, kind: ExternalKind, branch: BranchId) -> f64 {
        match (self.sources, kind) {
            (Some(s), ExternalKind::Voltage) => s.voltage(branch, self.time),
            (Some(s), ExternalKind::Current) => s.current(branch, self.time),
            (None, _) => f64::NAN,
        }
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("prev", &self.prev)
            .field("time", &self.time)
            .field("step", &self.step)
            .field("phase", &self.phase)
            .field("sources", &self.sources.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_lookup() {
        let sources = FnSources::new(|b: BranchId, t: f64| b.0 as f64 + t, |_, _| -1.0);
        let prev = [0.0];
        let b = Binding::stepping(&prev, 0.5, 0.1).with_sources(Some(&sources));
        assert_eq!(b.external(ExternalKind::Voltage, BranchId(2)), 2.5);
        assert_eq!(b.external(ExternalKind::Current, BranchId(0)), -1.0);
    }

    #[test]
    fn test_missing_provider_is_nan() {
        let prev = [0.0];
        let b = Binding::start(&prev, 0.0, 1.0);
        assert!(b.external(ExternalKind::Voltage, BranchId(0)).is_nan());
    }
}
