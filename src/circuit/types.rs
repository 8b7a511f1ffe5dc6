//! Core types for circuit representation.

use std::fmt;

use crate::expr::{Expr, Signal};

/// Label of the reference (ground) node. It is fixed at 0 V and never
/// receives an unknown slot.
pub const REFERENCE_NODE: &str = "0";

/// Check if a node label names the reference node.
pub fn is_reference(node: &str) -> bool {
    node == REFERENCE_NODE
}

/// Stable zero-based index of a branch, assigned in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i({})", self.0)
    }
}

/// The closed set of element kinds the device library understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Inductor,
    VoltageSource,
    CurrentSource,
    /// Voltage-controlled voltage source
    Vcvs,
    /// Voltage-controlled current source
    Vccs,
    /// Current-controlled voltage source
    Ccvs,
    /// Current-controlled current source
    Cccs,
    BehavioralCurrentSource,
    BehavioralVoltageSource,
}

impl ComponentKind {
    /// Parse an element kind from its netlist prefix letter.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'R' => Some(Self::Resistor),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'V' => Some(Self::VoltageSource),
            'I' => Some(Self::CurrentSource),
            'E' => Some(Self::Vcvs),
            'G' => Some(Self::Vccs),
            'H' => Some(Self::Ccvs),
            'F' => Some(Self::Cccs),
            // Behavioral sources share the 'B' prefix; the parser picks the flavor
            'B' => Some(Self::BehavioralCurrentSource),
            _ => None,
        }
    }

    /// True if the branch law constrains the terminal voltage rather than the current.
    pub fn is_voltage_defined(&self) -> bool {
        matches!(
            self,
            Self::Inductor
                | Self::VoltageSource
                | Self::Vcvs
                | Self::Ccvs
                | Self::BehavioralVoltageSource
        )
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resistor => "resistor",
            Self::Capacitor => "capacitor",
            Self::Inductor => "inductor",
            Self::VoltageSource => "voltage source",
            Self::CurrentSource => "current source",
            Self::Vcvs => "VCVS",
            Self::Vccs => "VCCS",
            Self::Ccvs => "CCVS",
            Self::Cccs => "CCCS",
            Self::BehavioralCurrentSource => "behavioral current source",
            Self::BehavioralVoltageSource => "behavioral voltage source",
        };
        f.write_str(name)
    }
}

/// Controlling node pair of a voltage-controlled source.
#[derive(Debug, Clone, PartialEq)]
pub struct VoltageSense {
    pub plus: String,
    pub minus: String,
}

impl VoltageSense {
    pub fn new(plus: impl Into<String>, minus: impl Into<String>) -> Self {
        Self {
            plus: plus.into(),
            minus: minus.into(),
        }
    }
}

/// Controlling branch pair of a current-controlled source.
///
/// The controlling signal is `i(plus) - i(minus)`; a missing `minus`
/// senses a single branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentSense {
    pub plus: BranchId,
    pub minus: Option<BranchId>,
}

impl CurrentSense {
    /// Sense the current of a single branch.
    pub fn single(branch: BranchId) -> Self {
        Self {
            plus: branch,
            minus: None,
        }
    }

    /// Sense the difference of two branch currents.
    pub fn difference(plus: BranchId, minus: BranchId) -> Self {
        Self {
            plus,
            minus: Some(minus),
        }
    }
}

/// Value of an independent source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    /// Constant or time-dependent expression (DC level, pulse, sine, ...)
    Expr(Expr<Signal>),
    /// Value pulled from the run's external source provider
    External,
}

impl From<f64> for SourceValue {
    fn from(value: f64) -> Self {
        SourceValue::Expr(Expr::Const(value))
    }
}

impl From<Expr<Signal>> for SourceValue {
    fn from(expr: Expr<Signal>) -> Self {
        SourceValue::Expr(expr)
    }
}

/// Element-specific data of a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Resistor {
        resistance: Expr<Signal>,
    },
    Capacitor {
        capacitance: Expr<Signal>,
        initial_condition: Option<f64>,
    },
    Inductor {
        inductance: Expr<Signal>,
        initial_condition: Option<f64>,
    },
    VoltageSource {
        value: SourceValue,
    },
    CurrentSource {
        value: SourceValue,
    },
    Vcvs {
        gain: f64,
        sense: VoltageSense,
    },
    Vccs {
        gain: f64,
        sense: VoltageSense,
    },
    Ccvs {
        gain: f64,
        sense: CurrentSense,
    },
    Cccs {
        gain: f64,
        sense: CurrentSense,
    },
    BehavioralCurrent {
        expr: Expr<Signal>,
    },
    BehavioralVoltage {
        expr: Expr<Signal>,
    },
}

impl Element {
    pub fn resistor(resistance: f64) -> Self {
        Element::Resistor {
            resistance: Expr::Const(resistance),
        }
    }

    pub fn capacitor(capacitance: f64) -> Self {
        Element::Capacitor {
            capacitance: Expr::Const(capacitance),
            initial_condition: None,
        }
    }

    pub fn inductor(inductance: f64) -> Self {
        Element::Inductor {
            inductance: Expr::Const(inductance),
            initial_condition: None,
        }
    }

    pub fn voltage_source(value: impl Into<SourceValue>) -> Self {
        Element::VoltageSource {
            value: value.into(),
        }
    }

    pub fn current_source(value: impl Into<SourceValue>) -> Self {
        Element::CurrentSource {
            value: value.into(),
        }
    }

    /// Attach a declared initial condition (capacitor voltage or inductor current).
    ///
    /// Ignored for every other element kind.
    pub fn with_initial_condition(mut self, ic: f64) -> Self {
        match &mut self {
            Element::Capacitor {
                initial_condition, ..
            }
            | Element::Inductor {
                initial_condition, ..
            } => *initial_condition = Some(ic),
            _ => {}
        }
        self
    }

    /// Get the element kind.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Element::Resistor { .. } => ComponentKind::Resistor,
            Element::Capacitor { .. } => ComponentKind::Capacitor,
            Element::Inductor { .. } => ComponentKind::Inductor,
            Element::VoltageSource { .. } => ComponentKind::VoltageSource,
            Element::CurrentSource { .. } => ComponentKind::CurrentSource,
            Element::Vcvs { .. } => ComponentKind::Vcvs,
            Element::Vccs { .. } => ComponentKind::Vccs,
            Element::Ccvs { .. } => ComponentKind::Ccvs,
            Element::Cccs { .. } => ComponentKind::Cccs,
            Element::BehavioralCurrent { .. } => ComponentKind::BehavioralCurrentSource,
            Element::BehavioralVoltage { .. } => ComponentKind::BehavioralVoltageSource,
        }
    }

    /// Declared initial condition, if any.
    pub fn initial_condition(&self) -> Option<f64> {
        match self {
            Element::Capacitor {
                initial_condition, ..
            }
            | Element::Inductor {
                initial_condition, ..
            } => *initial_condition,
            _ => None,
        }
    }

    /// True if the element reads its value from an external source provider.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Element::VoltageSource {
                value: SourceValue::External
            } | Element::CurrentSource {
                value: SourceValue::External
            }
        )
    }
}

/// One circuit element between two principal terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub index: BranchId,
    pub name: String,
    /// Positive terminal; branch current flows from here through the element
    pub plus: String,
    /// Negative terminal
    pub minus: String,
    pub element: Element,
}

impl Branch {
    /// Get the element kind.
    pub fn kind(&self) -> ComponentKind {
        self.element.kind()
    }

    /// Both principal terminals, plus first.
    pub fn terminals(&self) -> [&str; 2] {
        [&self.plus, &self.minus]
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} -> {}, {})",
            self.kind(),
            self.name,
            self.plus,
            self.minus,
            self.index
        )
    }
}
