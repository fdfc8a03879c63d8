//! Clinical Report CLI support
//!
//! Shared plumbing for the `ngs-report` and `qc-report` binaries: common
//! arguments, configuration loading, logging setup and summary output. All
//! report logic lives in clinical-report-core.

pub mod args;
pub mod config;
pub mod logging;
pub mod output;

pub use args::CommonArgs;
pub use config::{load_config, resolve_config};
pub use logging::init_logging;
pub use output::report_summary;
