//! Crate-wide error type.
//!
//! The numeric core reports four kinds of failure (input shape, unsupported
//! configuration, non-convergence, domain). The file/CLI layers add `Io` and
//! `Parse`. The binary maps every error to a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`HydrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputShape,
    UnsupportedConfig,
    NonConvergence,
    Domain,
    Io,
    Parse,
}

#[derive(Error, Debug)]
pub enum HydrationError {
    /// Series with mismatched lengths, empty series, or non-finite samples.
    #[error("Input shape error: {what}")]
    InputShape { what: String },

    /// An option string that names no known model.
    #[error("Unsupported configuration: {what}")]
    UnsupportedConfig { what: String },

    /// A fit or root solve that did not converge within its budget.
    #[error("Numerical non-convergence in {stage}: {what}")]
    NonConvergence { stage: &'static str, what: String },

    /// A derived quantity that would divide by (numerically) zero, or an
    /// out-of-range physical parameter.
    #[error("Domain error: {what}")]
    Domain { what: String },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {what}")]
    Parse { what: String },
}

pub type HydrationResult<T> = Result<T, HydrationError>;

impl HydrationError {
    pub fn input_shape(what: impl Into<String>) -> Self {
        Self::InputShape { what: what.into() }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::UnsupportedConfig { what: what.into() }
    }

    pub fn non_convergence(stage: &'static str, what: impl Into<String>) -> Self {
        Self::NonConvergence {
            stage,
            what: what.into(),
        }
    }

    pub fn domain(what: impl Into<String>) -> Self {
        Self::Domain { what: what.into() }
    }

    pub fn parse(what: impl Into<String>) -> Self {
        Self::Parse { what: what.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Re-label a non-convergence error with the pipeline stage it came from.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            Self::NonConvergence { what, .. } => Self::NonConvergence { stage, what },
            other => other,
        }
    }

    /// Prefix the message with `ctx` (a file or experiment name), keeping the kind.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            Self::InputShape { what } => Self::InputShape { what: format!("{ctx}: {what}") },
            Self::UnsupportedConfig { what } => Self::UnsupportedConfig { what: format!("{ctx}: {what}") },
            Self::NonConvergence { stage, what } => Self::NonConvergence {
                stage,
                what: format!("{ctx}: {what}"),
            },
            Self::Domain { what } => Self::Domain { what: format!("{ctx}: {what}") },
            Self::Parse { what } => Self::Parse { what: format!("{ctx}: {what}") },
            io @ Self::Io { .. } => io,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputShape { .. } => ErrorKind::InputShape,
            Self::UnsupportedConfig { .. } => ErrorKind::UnsupportedConfig,
            Self::NonConvergence { .. } => ErrorKind::NonConvergence,
            Self::Domain { .. } => ErrorKind::Domain,
            Self::Io { .. } => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Parse,
        }
    }

    /// Process exit code used by the `odnp` binary.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Io | ErrorKind::Parse | ErrorKind::UnsupportedConfig => 2,
            ErrorKind::InputShape => 3,
            ErrorKind::NonConvergence | ErrorKind::Domain => 4,
        }
    }
}

/// Return `v` if it is finite, otherwise a domain error naming `what`.
pub fn ensure_finite(v: f64, what: &str) -> HydrationResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HydrationError::domain(format!("{what} is not finite ({v})")))
    }
}

/// Divide `num / den`, failing with a domain error when `den` is numerically zero.
pub fn checked_div(num: f64, den: f64, what: &str) -> HydrationResult<f64> {
    if !den.is_finite() || den.abs() <= f64::MIN_POSITIVE {
        return Err(HydrationError::domain(format!(
            "{what}: denominator is zero or not finite ({den})"
        )));
    }
    ensure_finite(num / den, what)
}
