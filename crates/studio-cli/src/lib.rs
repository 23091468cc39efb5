//! Headless driver for Studio scenes: the pieces behind the `studio`
//! binary, kept in a library so they can be tested without a process.

pub mod commands;
pub mod scene;
pub mod sink;

pub use commands::{ExportArgs, Exported, LintArgs, LintReport, run_export, run_lint};
pub use scene::{load_config, load_scene};
pub use sink::FileSink;
