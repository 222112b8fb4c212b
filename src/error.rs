//! Unified error type for all public APIs.
//!
//! Errors are surfaced, never recovered: an invalid configuration or an
//! unmet generator requirement is fatal to the rank at setup time, and a
//! broken sampler invariant aborts generation with full context.

use thiserror::Error;

/// Unified error type for generator, driver and IO operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or inconsistent configuration, detected at setup.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A generator's declared requirement is not met by the current rank
    /// count or chunk count.
    #[error("unmet generator requirement: {0}")]
    Requirement(String),

    /// Output or input failure; reported, not retried.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A sampler draw exceeded its bound or a multinomial split did not
    /// conserve its total. These are bugs, never expected.
    #[error(
        "internal invariant violated: {message} (seed {seed}, chunk {chunk_id}, level {level})"
    )]
    InternalInvariant {
        message: String,
        seed: u64,
        chunk_id: u64,
        level: u64,
    },
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Configuration(message.into())
    }

    /// Shorthand for a [`Error::Requirement`] error.
    pub fn requirement<S: Into<String>>(message: S) -> Self {
        Error::Requirement(message.into())
    }
}
