//! SPICE "raw" file writer.
//!
//! Layout:
//!
//! ```text
//! Title: <title>
//! Date: <date>
//! Plotname: Transient Analysis | Operating Point
//! Flags: real
//! No. Variables: <count>
//! No. Points: <count>
//! Variables:
//! \t0\ttime\ttime            (transient only)
//! \t<i>\tV(<node>)\tvoltage   (one per node)
//! Binary:
//! <f64 little-endian per variable per point>
//! ```
//!
//! Only node voltages are written; branch currents stay in the trajectory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SimError};
use crate::solver::{Analysis, Trajectory};

fn io_error(source: std::io::Error) -> SimError {
    SimError::OutputWriteError { source }
}

/// Serializes trajectories in the raw format.
#[derive(Debug, Clone)]
pub struct RawWriter {
    title: String,
    date: String,
}

impl RawWriter {
    /// `date` is written verbatim into the header.
    pub fn new(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
        }
    }

    /// Write the header and binary block for `trajectory`.
    pub fn write<W: Write>(&self, trajectory: &Trajectory, analysis: &Analysis, mut out: W) -> Result<()> {
        let with_time = matches!(analysis, Analysis::Transient(_));
        let offset = usize::from(with_time);
        let num_variables = offset + trajectory.nodes.len();

        let mut header = String::new();
        header.push_str(&format!("Title: {}\n", self.title));
        header.push_str(&format!("Date: {}\n", self.date));
        header.push_str(&format!("Plotname: {}\n", analysis.plot_name()));
        header.push_str("Flags: real\n");
        header.push_str(&format!("No. Variables: {}\n", num_variables));
        header.push_str(&format!("No. Points: {}\n", trajectory.len()));
        header.push_str("Variables:\n");
        if with_time {
            header.push_str("\t0\ttime\ttime\n");
        }
        for (i, node) in trajectory.nodes.iter().enumerate() {
            header.push_str(&format!("\t{}\tV({})\tvoltage\n", i + offset, node));
        }
        header.push_str("Binary:\n");
        out.write_all(header.as_bytes()).map_err(io_error)?;

        let num_nodes = trajectory.nodes.len();
        for point in &trajectory.points {
            if with_time {
                let time = point.time.unwrap_or(0.0);
                out.write_all(&time.to_le_bytes()).map_err(io_error)?;
            }
            for value in point.values.iter().take(num_nodes) {
                out.write_all(&value.to_le_bytes()).map_err(io_error)?;
            }
        }
        out.flush().map_err(io_error)?;

        debug!(
            variables = num_variables,
            points = trajectory.len(),
            "wrote raw file"
        );
        Ok(())
    }

    /// Create (or truncate) `path` and write the raw file into it.
    pub fn write_to_path(&self, trajectory: &Trajectory, analysis: &Analysis, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(io_error)?;
        self.write(trajectory, analysis, BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{SolutionPoint, TransientParams};

    fn trajectory(points: Vec<SolutionPoint>) -> Trajectory {
        Trajectory {
            nodes: vec!["1".to_string(), "out".to_string()],
            variables: vec![
                "V(1)".to_string(),
                "V(out)".to_string(),
                "i(0)".to_string(),
            ],
            points,
        }
    }

    fn split(bytes: &[u8]) -> (String, Vec<f64>) {
        let marker = b"Binary:\n";
        let pos = bytes
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len();
        let header = String::from_utf8(bytes[..pos].to_vec()).unwrap();
        let values = bytes[pos..]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        (header, values)
    }

    #[test]
    fn test_operating_point_layout() {
        let t = trajectory(vec![SolutionPoint::operating_point(vec![5.0, 2.5, -1e-3])]);
        let mut bytes = Vec::new();
        RawWriter::new("divider", "Mon Oct 19 12:00:00 2026")
            .write(&t, &Analysis::OperatingPoint, &mut bytes)
            .unwrap();

        let (header, values) = split(&bytes);
        assert_eq!(
            header,
            "Title: divider\n\
             Date: Mon Oct 19 12:00:00 2026\n\
             Plotname: Operating Point\n\
             Flags: real\n\
             No. Variables: 2\n\
             No. Points: 1\n\
             Variables:\n\
             \t0\tV(1)\tvoltage\n\
             \t1\tV(out)\tvoltage\n\
             Binary:\n"
        );
        // Branch currents are not written
        assert_eq!(values, vec![5.0, 2.5]);
    }

    #[test]
    fn test_transient_layout_puts_time_first() {
        let t = trajectory(vec![
            SolutionPoint::at(0.0, vec![1.0, 0.0, 0.0]),
            SolutionPoint::at(1e-3, vec![1.0, 0.5, 1e-4]),
        ]);
        let analysis = Analysis::Transient(TransientParams::new(1e-3, 1e-3));
        let mut bytes = Vec::new();
        RawWriter::new("rc", "today")
            .write(&t, &analysis, &mut bytes)
            .unwrap();

        let (header, values) = split(&bytes);
        assert!(header.contains("Plotname: Transient Analysis\n"));
        assert!(header.contains("No. Variables: 3\n"));
        assert!(header.contains("No. Points: 2\n"));
        assert!(header.contains("\t0\ttime\ttime\n\t1\tV(1)\tvoltage\n\t2\tV(out)\tvoltage\n"));
        assert_eq!(values, vec![0.0, 1.0, 0.0, 1e-3, 1.0, 0.5]);
    }
}
