//! Typed expression trees.
//!
//! Every device law and KCL equation is an [`Expr`] whose root value must
//! be driven to zero. Expressions are generic over their variable leaf:
//! netlist-level values use named [`Signal`]s, and equation synthesis
//! resolves them into solution-vector slots (`Expr<usize>`), which are
//! then evaluated by walking the tree against a [`Binding`].
//!
//! Partial derivatives are exact: [`Expr::accumulate_gradient`] applies the
//! chain rule down the tree, so the Newton Jacobian carries no
//! finite-difference error.

mod binding;
mod waveform;

pub use binding::{Binding, ExternalKind, ExternalSources, FnSources, Phase};
pub use waveform::{Pulse, Sine};

use std::fmt;
use std::ops;

use crate::circuit::BranchId;

/// A named circuit quantity referenced from a netlist expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Voltage of a node relative to the reference
    Voltage(String),
    /// Current through a branch
    Current(BranchId),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Voltage(node) => write!(f, "v({})", node),
            Signal::Current(id) => write!(f, "{}", id),
        }
    }
}

/// Single-argument functions available in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
    Tanh,
    Atan,
}

impl Func {
    /// Look up a function by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "exp" => Some(Self::Exp),
            "ln" | "log" => Some(Self::Ln),
            "log10" => Some(Self::Log10),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "tanh" => Some(Self::Tanh),
            "atan" => Some(Self::Atan),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Tanh => "tanh",
            Self::Atan => "atan",
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Tanh => x.tanh(),
            Self::Atan => x.atan(),
        }
    }

    /// First derivative at `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Self::Exp => x.exp(),
            Self::Ln => 1.0 / x,
            Self::Log10 => 1.0 / (x * std::f64::consts::LN_10),
            Self::Sqrt => 0.5 / x.sqrt(),
            Self::Abs => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Self::Sin => x.cos(),
            Self::Cos => -x.sin(),
            Self::Tan => {
                let c = x.cos();
                1.0 / (c * c)
            }
            Self::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            Self::Atan => 1.0 / (1.0 + x * x),
        }
    }
}

/// Expression tree over variable leaves of type `V`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<V> {
    Const(f64),
    /// Unknown being solved for at the current point
    Var(V),
    /// Same unknown at the previously accepted point
    Prev(V),
    /// Simulation time of the point being solved
    Time,
    /// Distance to the previously accepted point
    Step,
    /// Value supplied by the run's external source provider
    External(ExternalKind, BranchId),
    Neg(Box<Expr<V>>),
    Add(Box<Expr<V>>, Box<Expr<V>>),
    Sub(Box<Expr<V>>, Box<Expr<V>>),
    Mul(Box<Expr<V>>, Box<Expr<V>>),
    Div(Box<Expr<V>>, Box<Expr<V>>),
    Pow(Box<Expr<V>>, Box<Expr<V>>),
    Call(Func, Box<Expr<V>>),
    Pulse(Pulse),
    Sine(Sine),
    /// `start` while solving the first transient point, `stepping` afterwards
    Phased {
        start: Box<Expr<V>>,
        stepping: Box<Expr<V>>,
    },
}

impl Expr<Signal> {
    /// Voltage of a node.
    pub fn voltage(node: impl Into<String>) -> Self {
        Expr::Var(Signal::Voltage(node.into()))
    }

    /// Voltage difference between two nodes.
    pub fn voltage_between(plus: impl Into<String>, minus: impl Into<String>) -> Self {
        Expr::voltage(plus) - Expr::voltage(minus)
    }

    /// Current through a branch.
    pub fn current(branch: BranchId) -> Self {
        Expr::Var(Signal::Current(branch))
    }
}

impl<V> Expr<V> {
    pub fn call(func: Func, arg: Expr<V>) -> Self {
        Expr::Call(func, Box::new(arg))
    }

    pub fn pow(base: Expr<V>, exponent: Expr<V>) -> Self {
        Expr::Pow(Box::new(base), Box::new(exponent))
    }

    pub fn phased(start: Expr<V>, stepping: Expr<V>) -> Self {
        Expr::Phased {
            start: Box::new(start),
            stepping: Box::new(stepping),
        }
    }

    /// Sum of terms; the empty sum is the constant 0.
    pub fn sum(terms: impl IntoIterator<Item = Expr<V>>) -> Self {
        terms
            .into_iter()
            .reduce(|acc, term| acc + term)
            .unwrap_or(Expr::Const(0.0))
    }

    /// The constant value, if this expression is a literal.
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// All variable leaves (current and previous), in tree order.
    pub fn variables(&self) -> Vec<&V> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a V>) {
        match self {
            Expr::Var(v) | Expr::Prev(v) => out.push(v),
            Expr::Const(_)
            | Expr::Time
            | Expr::Step
            | Expr::External(..)
            | Expr::Pulse(_)
            | Expr::Sine(_) => {}
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_variables(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expr::Phased { start, stepping } => {
                start.collect_variables(out);
                stepping.collect_variables(out);
            }
        }
    }

    /// True if the tree reads the external source provider.
    pub fn uses_external(&self) -> bool {
        match self {
            Expr::External(..) => true,
            Expr::Const(_)
            | Expr::Var(_)
            | Expr::Prev(_)
            | Expr::Time
            | Expr::Step
            | Expr::Pulse(_)
            | Expr::Sine(_) => false,
            Expr::Neg(a) | Expr::Call(_, a) => a.uses_external(),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.uses_external() || b.uses_external(),
            Expr::Phased { start, stepping } => start.uses_external() || stepping.uses_external(),
        }
    }

    /// Rewrite variable leaves. The callback returns `None` for leaves that
    /// are identically zero (the reference node), which become `Const(0.0)`.
    pub fn resolve_with<W, E>(
        &self,
        f: &mut impl FnMut(&V) -> std::result::Result<Option<W>, E>,
    ) -> std::result::Result<Expr<W>, E> {
        Ok(match self {
            Expr::Const(c) => Expr::Const(*c),
            Expr::Var(v) => f(v)?.map_or(Expr::Const(0.0), Expr::Var),
            Expr::Prev(v) => f(v)?.map_or(Expr::Const(0.0), Expr::Prev),
            Expr::Time => Expr::Time,
            Expr::Step => Expr::Step,
            Expr::External(kind, branch) => Expr::External(*kind, *branch),
            Expr::Neg(a) => Expr::Neg(Box::new(a.resolve_with(f)?)),
            Expr::Add(a, b) => Expr::Add(Box::new(a.resolve_with(f)?), Box::new(b.resolve_with(f)?)),
            Expr::Sub(a, b) => Expr::Sub(Box::new(a.resolve_with(f)?), Box::new(b.resolve_with(f)?)),
            Expr::Mul(a, b) => Expr::Mul(Box::new(a.resolve_with(f)?), Box::new(b.resolve_with(f)?)),
            Expr::Div(a, b) => Expr::Div(Box::new(a.resolve_with(f)?), Box::new(b.resolve_with(f)?)),
            Expr::Pow(a, b) => Expr::Pow(Box::new(a.resolve_with(f)?), Box::new(b.resolve_with(f)?)),
            Expr::Call(func, a) => Expr::Call(*func, Box::new(a.resolve_with(f)?)),
            Expr::Pulse(p) => Expr::Pulse(p.clone()),
            Expr::Sine(s) => Expr::Sine(s.clone()),
            Expr::Phased { start, stepping } => Expr::Phased {
                start: Box::new(start.resolve_with(f)?),
                stepping: Box::new(stepping.resolve_with(f)?),
            },
        })
    }
}

impl Expr<usize> {
    /// Evaluate at unknown vector `x`.
    pub fn eval(&self, x: &[f64], b: &Binding<'_>) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(slot) => x[*slot],
            Expr::Prev(slot) => b.prev[*slot],
            Expr::Time => b.time,
            Expr::Step => b.step,
            Expr::External(kind, branch) => b.external(*kind, *branch),
            Expr::Neg(a) => -a.eval(x, b),
            Expr::Add(l, r) => l.eval(x, b) + r.eval(x, b),
            Expr::Sub(l, r) => l.eval(x, b) - r.eval(x, b),
            Expr::Mul(l, r) => l.eval(x, b) * r.eval(x, b),
            Expr::Div(l, r) => l.eval(x, b) / r.eval(x, b),
            Expr::Pow(l, r) => l.eval(x, b).powf(r.eval(x, b)),
            Expr::Call(func, a) => func.apply(a.eval(x, b)),
            Expr::Pulse(p) => p.evaluate(b.time),
            Expr::Sine(s) => s.evaluate(b.time),
            Expr::Phased { start, stepping } => match b.phase {
                Phase::Start => start.eval(x, b),
                Phase::Stepping => stepping.eval(x, b),
            },
        }
    }

    /// Add `scale * d(self)/dx[k]` into `grad[k]` for every slot `k`.
    pub fn accumulate_gradient(&self, x: &[f64], b: &Binding<'_>, scale: f64, grad: &mut [f64]) {
        match self {
            Expr::Var(slot) => grad[*slot] += scale,
            Expr::Const(_)
            | Expr::Prev(_)
            | Expr::Time
            | Expr::Step
            | Expr::External(..)
            | Expr::Pulse(_)
            | Expr::Sine(_) => {}
            Expr::Neg(a) => a.accumulate_gradient(x, b, -scale, grad),
            Expr::Add(l, r) => {
                l.accumulate_gradient(x, b, scale, grad);
                r.accumulate_gradient(x, b, scale, grad);
            }
            Expr::Sub(l, r) => {
                l.accumulate_gradient(x, b, scale, grad);
                r.accumulate_gradient(x, b, -scale, grad);
            }
            Expr::Mul(l, r) => {
                let lv = l.eval(x, b);
                let rv = r.eval(x, b);
                l.accumulate_gradient(x, b, scale * rv, grad);
                r.accumulate_gradient(x, b, scale * lv, grad);
            }
            Expr::Div(l, r) => {
                let lv = l.eval(x, b);
                let rv = r.eval(x, b);
                l.accumulate_gradient(x, b, scale / rv, grad);
                r.accumulate_gradient(x, b, -scale * lv / (rv * rv), grad);
            }
            Expr::Pow(l, r) => {
                let lv = l.eval(x, b);
                let rv = r.eval(x, b);
                l.accumulate_gradient(x, b, scale * rv * lv.powf(rv - 1.0), grad);
                // d/dr of l^r is only defined for a positive base
                if lv > 0.0 {
                    r.accumulate_gradient(x, b, scale * lv.powf(rv) * lv.ln(), grad);
                }
            }
            Expr::Call(func, a) => {
                let av = a.eval(x, b);
                a.accumulate_gradient(x, b, scale * func.derivative(av), grad);
            }
            Expr::Phased { start, stepping } => match b.phase {
                Phase::Start => start.accumulate_gradient(x, b, scale, grad),
                Phase::Stepping => stepping.accumulate_gradient(x, b, scale, grad),
            },
        }
    }
}

impl<V> From<f64> for Expr<V> {
    fn from(value: f64) -> Self {
        Expr::Const(value)
    }
}

impl<V> ops::Add for Expr<V> {
    type Output = Expr<V>;

    fn add(self, rhs: Expr<V>) -> Expr<V> {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl<V> ops::Sub for Expr<V> {
    type Output = Expr<V>;

    fn sub(self, rhs: Expr<V>) -> Expr<V> {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl<V> ops::Mul for Expr<V> {
    type Output = Expr<V>;

    fn mul(self, rhs: Expr<V>) -> Expr<V> {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl<V> ops::Div for Expr<V> {
    type Output = Expr<V>;

    fn div(self, rhs: Expr<V>) -> Expr<V> {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl<V> ops::Neg for Expr<V> {
    type Output = Expr<V>;

    fn neg(self) -> Expr<V> {
        Expr::Neg(Box::new(self))
    }
}

impl<V: fmt::Display> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(c) => write!(f, "{}", c),
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Prev(v) => write!(f, "prev[{}]", v),
            Expr::Time => write!(f, "t"),
            Expr::Step => write!(f, "dt"),
            Expr::External(kind, branch) => write!(f, "{}[{}]", kind, branch.0),
            Expr::Neg(a) => write!(f, "-({})", a),
            Expr::Add(l, r) => write!(f, "({} + {})", l, r),
            Expr::Sub(l, r) => write!(f, "({} - {})", l, r),
            Expr::Mul(l, r) => write!(f, "({} * {})", l, r),
            Expr::Div(l, r) => write!(f, "({} / {})", l, r),
            Expr::Pow(l, r) => write!(f, "({} ^ {})", l, r),
            Expr::Call(func, a) => write!(f, "{}({})", func.name(), a),
            Expr::Pulse(p) => write!(f, "{}", p),
            Expr::Sine(s) => write!(f, "{}", s),
            Expr::Phased { start, stepping } => {
                write!(f, "[start: {}; step: {}]", start, stepping)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn binding<'a>(prev: &'a [f64]) -> Binding<'a> {
        Binding::stepping(prev, 1e-3, 1e-3)
    }

    #[test]
    fn test_eval_arithmetic() {
        // (x0 - x1) - x2 * 100
        let e: Expr<usize> = (Expr::Var(0) - Expr::Var(1)) - Expr::Var(2) * Expr::Const(100.0);
        let prev = [0.0; 3];
        let v = e.eval(&[5.0, 1.0, 0.04], &binding(&prev));
        assert_relative_eq!(v, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_of_linear_terms_is_exact() {
        let e: Expr<usize> = (Expr::Var(0) - Expr::Const(0.0)) - Expr::Const(2.5);
        let prev = [0.0; 2];
        let mut grad = [0.0; 2];
        e.accumulate_gradient(&[1.0, 1.0], &binding(&prev), 1.0, &mut grad);
        assert_eq!(grad, [1.0, 0.0]);
    }

    #[test]
    fn test_gradient_of_product_and_function() {
        // x0 * exp(x1)
        let e: Expr<usize> = Expr::Var(0) * Expr::call(Func::Exp, Expr::Var(1));
        let prev = [0.0; 2];
        let x = [2.0, 0.5];
        let mut grad = [0.0; 2];
        e.accumulate_gradient(&x, &binding(&prev), 1.0, &mut grad);
        assert_relative_eq!(grad[0], 0.5f64.exp(), epsilon = 1e-12);
        assert_relative_eq!(grad[1], 2.0 * 0.5f64.exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_of_quotient_and_power() {
        // x0 / x1 + x0 ^ 3
        let e: Expr<usize> =
            Expr::Var(0) / Expr::Var(1) + Expr::pow(Expr::Var(0), Expr::Const(3.0));
        let prev = [0.0; 2];
        let x = [2.0, 4.0];
        let mut grad = [0.0; 2];
        e.accumulate_gradient(&x, &binding(&prev), 1.0, &mut grad);
        assert_relative_eq!(grad[0], 0.25 + 12.0, epsilon = 1e-12);
        assert_relative_eq!(grad[1], -2.0 / 16.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prev_and_step_do_not_contribute_to_gradient() {
        let e: Expr<usize> = Expr::Var(0) * Expr::Step - Expr::Prev(0);
        let prev = [3.0];
        let b = binding(&prev);
        let mut grad = [0.0];
        e.accumulate_gradient(&[1.0], &b, 1.0, &mut grad);
        assert_relative_eq!(grad[0], 1e-3);
        assert_relative_eq!(e.eval(&[1.0], &b), 1e-3 - 3.0);
    }

    #[test]
    fn test_phased_selects_by_phase() {
        let e: Expr<usize> = Expr::phased(Expr::Const(1.0), Expr::Const(2.0));
        let prev = [0.0];
        assert_eq!(e.eval(&[0.0], &Binding::start(&prev, 0.0, 1.0)), 1.0);
        assert_eq!(e.eval(&[0.0], &binding(&prev)), 2.0);
    }

    #[test]
    fn test_resolve_maps_reference_to_zero() {
        let e = Expr::voltage_between("a", "0");
        let resolved: Expr<usize> = e
            .resolve_with(&mut |s: &Signal| -> Result<Option<usize>, ()> {
                Ok(match s {
                    Signal::Voltage(n) if n == "a" => Some(4),
                    _ => None,
                })
            })
            .unwrap();
        assert_eq!(resolved, Expr::Var(4) - Expr::Const(0.0));
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let e: Expr<usize> = Expr::sum(Vec::new());
        assert_eq!(e, Expr::Const(0.0));
    }

    #[test]
    fn test_variables_and_external_detection() {
        let e = Expr::voltage("a") * Expr::current(BranchId(2));
        assert_eq!(e.variables().len(), 2);
        assert!(!e.uses_external());

        let ext: Expr<usize> = Expr::External(ExternalKind::Voltage, BranchId(0)) + Expr::Const(1.0);
        assert!(ext.uses_external());
    }
}
