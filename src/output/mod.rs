//! Result serialization.

mod rawfile;

pub use rawfile::RawWriter;
