//! Core POP3 types shared by the command and response grammars.

/// Summary of a maildrop as reported by `STAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Number of messages in the maildrop.
    pub messages: u32,
    /// Total size of the maildrop in octets.
    pub total_bytes: u64,
}

/// One entry of a `LIST` response: message number and size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
    /// Message number (1-based).
    pub message: u32,
    /// Message size in octets.
    pub bytes: u64,
}

/// One entry of a `UIDL` response: message number and unique-id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidlEntry {
    /// Message number (1-based).
    pub message: u32,
    /// Server-assigned unique-id, 1 to 70 printable ASCII characters.
    pub uid: String,
}

/// Parsed server greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Free text following the status indicator.
    pub comment: String,
    /// APOP challenge in angle brackets, if the server advertises APOP.
    ///
    /// The challenge is kept verbatim (including the brackets) because the
    /// APOP digest is computed over the exact advertised form.
    pub apop_challenge: Option<String>,
}

impl Greeting {
    /// Returns `true` if the server advertises APOP support.
    #[must_use]
    pub const fn supports_apop(&self) -> bool {
        self.apop_challenge.is_some()
    }
}
