//! Maildrop backend capability trait.
//!
//! The session engine contains no storage and no credential checking;
//! everything a deployment-specific mailbox knows lives behind [`MailDrop`].
//! Methods return `impl Future + Send` so sessions generic over a backend
//! can be driven from spawned tasks; implement them with `async` blocks:
//!
//! ```
//! use popline_server::{AuthVerdict, BackendError, MailDrop};
//! use popline_proto::{ListEntry, Stat, UidlEntry};
//!
//! struct EmptyDrop;
//!
//! impl MailDrop for EmptyDrop {
//!     fn authenticate(
//!         &mut self,
//!         _user: &str,
//!         _password: &str,
//!     ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send {
//!         async { Ok(AuthVerdict::Reject) }
//!     }
//!     # fn stat(&mut self) -> impl Future<Output = Result<Stat, BackendError>> + Send {
//!     #     async { Ok(Stat { messages: 0, total_bytes: 0 }) }
//!     # }
//!     # fn list_all(&mut self) -> impl Future<Output = Result<Vec<ListEntry>, BackendError>> + Send {
//!     #     async { Ok(Vec::new()) }
//!     # }
//!     # fn list_one(&mut self, _message: u32) -> impl Future<Output = Result<Option<ListEntry>, BackendError>> + Send {
//!     #     async { Ok(None) }
//!     # }
//!     # fn uidl_all(&mut self) -> impl Future<Output = Result<Vec<UidlEntry>, BackendError>> + Send {
//!     #     async { Ok(Vec::new()) }
//!     # }
//!     # fn uidl_one(&mut self, _message: u32) -> impl Future<Output = Result<Option<UidlEntry>, BackendError>> + Send {
//!     #     async { Ok(None) }
//!     # }
//!     # fn retrieve(&mut self, _message: u32) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
//!     #     async { Ok(None) }
//!     # }
//!     # fn top(&mut self, _message: u32, _lines: u32) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
//!     #     async { Ok(None) }
//!     # }
//!     # fn delete(&mut self, _message: u32) -> impl Future<Output = Result<bool, BackendError>> + Send {
//!     #     async { Ok(false) }
//!     # }
//!     # fn reset(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
//!     #     async { Ok(()) }
//!     # }
//!     # fn quit(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
//!     #     async { Ok(()) }
//!     # }
//!     // ... remaining maildrop operations
//! }
//! ```

use std::future::Future;

use thiserror::Error;

use popline_proto::{ListEntry, Stat, UidlEntry};

/// The backend is unavailable or failed internally. Session-ending.
///
/// Client-correctable conditions (unknown message number, wrong password)
/// are *not* errors — they are expressed through `Option`, `bool` and
/// [`AuthVerdict`] return values and answered with `-ERR` on the wire.
#[derive(Debug, Clone, Error)]
#[error("maildrop backend unavailable: {message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Creates a backend error with the given description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    /// Credentials accepted; the session enters the transaction phase.
    Accept,
    /// Credentials rejected; the session returns to the start.
    Reject,
}

/// Capability set the session engine consumes.
///
/// One backend instance exists per connection and lives exactly as long
/// as its session; `quit` is where pending deletions become permanent
/// (RFC 1939 UPDATE state), and a session that ends any other way must
/// not commit them.
pub trait MailDrop: Send {
    /// Free text for the connection greeting, without the status token.
    fn banner(&self) -> impl Future<Output = String> + Send {
        async { String::from("POP3 server ready") }
    }

    /// Verifies a USER/PASS pair.
    fn authenticate(
        &mut self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send;

    /// Verifies an APOP digest against the challenge this session advertised.
    ///
    /// Only called when APOP is advertised; the default rejects.
    fn authenticate_apop(
        &mut self,
        user: &str,
        digest: &str,
        challenge: &str,
    ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send {
        let _ = (user, digest, challenge);
        async { Ok(AuthVerdict::Reject) }
    }

    /// Maildrop summary: message count and total octets, excluding
    /// messages marked as deleted.
    fn stat(&mut self) -> impl Future<Output = Result<Stat, BackendError>> + Send;

    /// Scan listing for the whole maildrop.
    fn list_all(&mut self) -> impl Future<Output = Result<Vec<ListEntry>, BackendError>> + Send;

    /// Scan listing for one message; `None` if it does not exist or is
    /// marked as deleted.
    fn list_one(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<ListEntry>, BackendError>> + Send;

    /// Unique-id listing for the whole maildrop.
    fn uidl_all(&mut self) -> impl Future<Output = Result<Vec<UidlEntry>, BackendError>> + Send;

    /// Unique-id listing for one message; `None` if it does not exist or
    /// is marked as deleted.
    fn uidl_one(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<UidlEntry>, BackendError>> + Send;

    /// Full message content as unstuffed lines; `None` if not found.
    fn retrieve(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send;

    /// Headers plus the first `lines` body lines; `None` if not found.
    fn top(
        &mut self,
        message: u32,
        lines: u32,
    ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send;

    /// Marks a message as deleted. Returns `false` if not found.
    fn delete(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Unmarks every message marked as deleted.
    ///
    /// Forwarded in any phase, not only during a transaction (RFC leniency).
    fn reset(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// No-op; the default does nothing.
    fn noop(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
        async { Ok(()) }
    }

    /// Session is ending normally: commit pending deletions.
    fn quit(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send;
}
