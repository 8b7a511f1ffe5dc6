//! Solution points, trajectories and result sinks.

use crate::circuit::Layout;

/// One solved unknown vector, with its timestamp for transient runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionPoint {
    /// `None` for an operating point
    pub time: Option<f64>,
    /// Unknown vector in layout order
    pub values: Vec<f64>,
}

impl SolutionPoint {
    pub fn operating_point(values: Vec<f64>) -> Self {
        Self { time: None, values }
    }

    pub fn at(time: f64, values: Vec<f64>) -> Self {
        Self {
            time: Some(time),
            values,
        }
    }

    /// Pair each value with its variable name, `time` first when present.
    pub fn named_values(&self, variables: &[String]) -> Vec<(String, f64)> {
        self.time
            .map(|t| ("time".to_string(), t))
            .into_iter()
            .chain(variables.iter().cloned().zip(self.values.iter().copied()))
            .collect()
    }
}

/// Ordered solution points of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Node labels in voltage-slot order
    pub nodes: Vec<String>,
    /// `V(node)` then `i(k)` names in slot order
    pub variables: Vec<String>,
    pub points: Vec<SolutionPoint>,
}

impl Trajectory {
    pub fn new(layout: &Layout) -> Self {
        Self {
            nodes: layout.nodes().to_vec(),
            variables: layout.variable_names(),
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_transient(&self) -> bool {
        self.points.first().is_some_and(|p| p.time.is_some())
    }

    /// Slot of a named variable (`V(n)` or `i(k)`).
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    /// Voltage of a node at every point. The reference node reads 0.
    pub fn node_voltage(&self, node: &str) -> Option<Vec<f64>> {
        if crate::circuit::is_reference(node) {
            return Some(vec![0.0; self.points.len()]);
        }
        let slot = self.nodes.iter().position(|n| n == node)?;
        Some(self.points.iter().map(|p| p.values[slot]).collect())
    }

    /// Timestamps of every point (empty for an operating point).
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.time).collect()
    }
}

/// Consumer of solution points as they are produced.
pub trait ResultSink {
    /// Called once per accepted point, before control returns to the caller.
    fn push(&mut self, point: &SolutionPoint, variables: &[String]);
}

impl<F> ResultSink for F
where
    F: FnMut(&SolutionPoint, &[String]),
{
    fn push(&mut self, point: &SolutionPoint, variables: &[String]) {
        self(point, variables)
    }
}

/// Sink that keeps every point as a name/value list.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub records: Vec<Vec<(String, f64)>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name` in record `index`.
    pub fn value(&self, index: usize, name: &str) -> Option<f64> {
        self.records
            .get(index)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

impl ResultSink for Recorder {
    fn push(&mut self, point: &SolutionPoint, variables: &[String]) {
        self.records.push(point.named_values(variables));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["V(a)".to_string(), "i(0)".to_string()]
    }

    #[test]
    fn test_named_values_put_time_first() {
        let point = SolutionPoint::at(1e-3, vec![2.0, -0.5]);
        let named = point.named_values(&names());
        assert_eq!(named[0], ("time".to_string(), 1e-3));
        assert_eq!(named[1], ("V(a)".to_string(), 2.0));
        assert_eq!(named.len(), 3);

        let op = SolutionPoint::operating_point(vec![2.0, -0.5]);
        assert_eq!(op.named_values(&names()).len(), 2);
    }

    #[test]
    fn test_recorder_and_closure_sinks() {
        let mut recorder = Recorder::new();
        recorder.push(&SolutionPoint::operating_point(vec![2.0, -0.5]), &names());
        assert_eq!(recorder.value(0, "i(0)"), Some(-0.5));
        assert_eq!(recorder.value(0, "time"), None);

        let mut count = 0;
        {
            let mut sink = |_: &SolutionPoint, vars: &[String]| count += vars.len();
            sink.push(&SolutionPoint::at(0.0, vec![1.0, 1.0]), &names());
        }
        assert_eq!(count, 2);
    }
}
