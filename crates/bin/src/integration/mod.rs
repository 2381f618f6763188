//! Glue between the command line and the library crates.
//!
//! Settings turn parsed arguments into store and publisher configs, the
//! pipeline runs the commands, and the logging writer keeps log lines from
//! tearing the progress bar.

pub(crate) mod logging;
pub(crate) mod pipeline;
pub(crate) mod settings;
