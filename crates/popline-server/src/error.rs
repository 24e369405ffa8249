//! Error types for the server engine.
//!
//! Only session-ending faults live here. Syntax, ordering and capability
//! failures are data, not errors: they are answered on the wire as `-ERR`
//! and never propagate (see `popline_proto::command::Rejection`).

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;

/// Session-ending faults.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure. Never retried; the session terminates.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client exceeded the configured line-length ceiling.
    #[error("request line exceeded {limit} bytes")]
    LineTooLong {
        /// The configured ceiling.
        limit: usize,
    },

    /// The inactivity deadline fired before the next request arrived.
    #[error("session idle for longer than {0:?}")]
    Timeout(Duration),

    /// The maildrop backend is unavailable.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
