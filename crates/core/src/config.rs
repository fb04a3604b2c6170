//! Load and carve options
//!
//! Verbosity, progress reporting and the worker count are explicit values passed to every
//! call that needs them; the crate keeps no process-wide toggles.

use serde::{Deserialize, Serialize};
use tracing::Level;

/// Options shared by ingestion and region carving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Decode worker count, `None` for the platform core count
    pub threads: Option<usize>,
    /// Emit load and carve summaries at `info` instead of `debug`
    pub verbose: bool,
    /// Emit an `info` event each time another tenth of the rank files is decoded
    pub show_progress: bool,
}

impl LoadOptions {
    /// Options with a fixed worker count
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Self::default()
        }
    }

    /// Set the verbose flag
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the progress flag
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Worker count actually used, at least one
    pub fn worker_count(&self) -> usize {
        self.threads
            .unwrap_or_else(|| {
                std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
            })
            .max(1)
    }

    /// Level for summary events
    pub(crate) fn summary_level(&self) -> Level {
        if self.verbose {
            Level::INFO
        } else {
            Level::DEBUG
        }
    }
}

/// Emit a summary event at the level chosen by [`LoadOptions::verbose`]
macro_rules! summary {
    ($options:expr, $($arg:tt)+) => {
        if $options.summary_level() == ::tracing::Level::INFO {
            ::tracing::info!($($arg)+);
        } else {
            ::tracing::debug!($($arg)+);
        }
    };
}

pub(crate) use summary;
