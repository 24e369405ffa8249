//! POP3 session state machine.
//!
//! This module defines the phases a POP3 session moves through,
//! following RFC 1939 section 3.

/// Session phase as defined by RFC 1939.
///
/// A session advances through at most four phases:
/// - `Unauthenticated`: initial phase, only USER/APOP (and NOOP/RSET/QUIT)
/// - `PasswordPending`: a USER name was accepted, waiting for PASS
/// - `Transaction`: authenticated, maildrop commands are legal
/// - `Closing`: QUIT was received, terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for USER or APOP.
    #[default]
    Unauthenticated,
    /// USER accepted, waiting for PASS.
    PasswordPending,
    /// Authenticated; STAT, LIST, UIDL, RETR, DELE and TOP are legal.
    Transaction,
    /// QUIT received. No transition leaves this phase.
    Closing,
}

/// Per-session protocol state consulted and advanced around each parse.
///
/// The grammar reads this state to decide which commands are legal; the
/// session driver advances it once the outcome of a command is known
/// (authentication is delegated to the backend, so PASS and APOP only
/// transition after the backend's verdict).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    phase: Phase,
    apop_supported: bool,
    pending_user: Option<String>,
}

impl SessionState {
    /// Creates the state for a freshly accepted connection.
    #[must_use]
    pub const fn new(apop_supported: bool) -> Self {
        Self {
            phase: Phase::Unauthenticated,
            apop_supported,
            pending_user: None,
        }
    }

    /// Current session phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether APOP is advertised on this session.
    #[must_use]
    pub const fn apop_supported(&self) -> bool {
        self.apop_supported
    }

    /// Username recorded by USER, cleared once PASS resolves.
    #[must_use]
    pub fn pending_user(&self) -> Option<&str> {
        self.pending_user.as_deref()
    }

    /// Returns `true` if maildrop commands are legal.
    #[must_use]
    pub const fn in_transaction(&self) -> bool {
        matches!(self.phase, Phase::Transaction)
    }

    /// USER was accepted: record the name and wait for PASS.
    pub fn accept_user(&mut self, name: impl Into<String>) {
        debug_assert!(matches!(self.phase, Phase::Unauthenticated));
        self.pending_user = Some(name.into());
        self.phase = Phase::PasswordPending;
    }

    /// The backend accepted the USER/PASS pair.
    ///
    /// Returns the username the session authenticated as.
    pub fn password_accepted(&mut self) -> Option<String> {
        debug_assert!(matches!(self.phase, Phase::PasswordPending));
        self.phase = Phase::Transaction;
        self.pending_user.take()
    }

    /// The backend rejected the USER/PASS pair: back to square one.
    pub fn password_rejected(&mut self) {
        debug_assert!(matches!(self.phase, Phase::PasswordPending));
        self.pending_user = None;
        self.phase = Phase::Unauthenticated;
    }

    /// The backend accepted an APOP digest: straight into transaction.
    pub fn apop_accepted(&mut self) {
        debug_assert!(matches!(self.phase, Phase::Unauthenticated));
        self.phase = Phase::Transaction;
    }

    /// QUIT was received. Terminal.
    pub fn close(&mut self) {
        self.phase = Phase::Closing;
    }
}
