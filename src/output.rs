use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Rendering of the final batch report.
///
/// `Text` goes through the log alongside the per-file messages. `Json` and
/// `Yaml` are printed alone on stdout for scripts that consume the report,
/// while the log stays on stderr.
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize, Default, PartialEq,)]
pub enum OutputFormat {
    /// One line per file plus a summary line, logged at info level
    #[default]
    Text,
    Json,
    Yaml,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
