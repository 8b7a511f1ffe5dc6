//! Nodalsim - SPICE-style circuit simulator
//!
//! Reads a netlist, runs its analysis and writes the solved node voltages
//! as a SPICE raw file.
//!
//! # Usage
//!
//! ```bash
//! nodalsim circuit.cir out.raw
//! RUST_LOG=nodalsim_core=debug nodalsim circuit.cir out.raw
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use nodalsim_core::{
    error::Result, netlist, output::RawWriter, solver::DEFAULT_MAX_ITERATIONS, Analysis,
    Simulator, SolverConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SPICE-style circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Path of the raw file to write
    #[arg(value_name = "OUTPUT_RAW")]
    output: PathBuf,

    /// Maximum Newton-Raphson iterations per solution point
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Absolute update tolerance
    #[arg(long)]
    abstol: Option<f64>,

    /// Relative update tolerance
    #[arg(long)]
    reltol: Option<f64>,

    /// Uniform initial guess for the first solve
    #[arg(long)]
    seed: Option<f64>,

    /// Date written into the raw file header (defaults to the current UTC time)
    #[arg(long)]
    date: Option<String>,

    /// Log solver progress at debug level
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "nodalsim_core=debug"
    } else {
        "nodalsim_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let netlist = netlist::parse_file(&args.netlist)?;

    let mut config = SolverConfig::new().with_max_iterations(args.max_iterations);
    if let Some(abstol) = args.abstol {
        config = config.with_abstol(abstol);
    }
    if let Some(reltol) = args.reltol {
        config = config.with_reltol(reltol);
    }
    if let Some(seed) = args.seed {
        config = config.with_initial_guess(seed);
    }

    let trajectory = Simulator::new(&netlist.circuit, netlist.analysis.clone())
        .with_config(config)
        .run()?;

    let date = args.date.unwrap_or_else(current_date);
    RawWriter::new(&netlist.title, date).write_to_path(&trajectory, &netlist.analysis, &args.output)?;

    if netlist.analysis == Analysis::OperatingPoint {
        if let Some(point) = trajectory.points.first() {
            for (node, value) in trajectory.nodes.iter().zip(&point.values) {
                println!("V({}) = {:.6e}", node, value);
            }
        }
    } else {
        tracing::info!(points = trajectory.len(), output = %args.output.display(), "transient run complete");
    }

    Ok(())
}

/// Current UTC time in the `Www Mmm dd hh:mm:ss yyyy` form used by raw files.
fn current_date() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format_date(secs)
}

/// Format seconds since the Unix epoch as a raw-file date.
fn format_date(secs: u64) -> String {
    const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;

    // Civil date from days since 1970-01-01 (proleptic Gregorian)
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{} {} {:2} {:02}:{:02}:{:02} {}",
        WEEKDAYS[days.rem_euclid(7) as usize],
        MONTHS[(month - 1) as usize],
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        year
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(0), "Thu Jan  1 00:00:00 1970");
        assert_eq!(format_date(1_000_000_000), "Sun Sep  9 01:46:40 2001");
        // Leap day
        assert_eq!(format_date(951_782_400), "Tue Feb 29 00:00:00 2000");
        assert_eq!(format_date(1_790_000_000), "Mon Sep 21 14:13:20 2026");
    }
}
