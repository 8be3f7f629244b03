//! Inference compute selection.
//!
//! Resolved once at startup from `INFERENCE_COMPUTE` and fixed for the life
//! of the process.

use std::fmt;
use std::str::FromStr;

use tracing::info;

/// Requested compute strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputePreference {
    /// Parallel when more than one core is available
    #[default]
    Auto,
    Parallel,
    Sequential,
}

impl FromStr for ComputePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown compute mode '{}', expected auto, parallel or sequential",
                other
            )),
        }
    }
}

/// Resolved compute strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeMode {
    /// Video frames are convolved on the rayon pool
    Parallel,
    /// Everything runs on the calling thread
    Sequential,
}

impl ComputeMode {
    pub fn resolve(preference: ComputePreference) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mode = match preference {
            ComputePreference::Parallel => Self::Parallel,
            ComputePreference::Sequential => Self::Sequential,
            ComputePreference::Auto if cores > 1 => Self::Parallel,
            ComputePreference::Auto => Self::Sequential,
        };

        info!(?preference, cores, mode = %mode, "Resolved inference compute mode");
        mode
    }
}

impl fmt::Display for ComputeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeMode::Parallel => write!(f, "parallel"),
            ComputeMode::Sequential => write!(f, "sequential"),
        }
    }
}
