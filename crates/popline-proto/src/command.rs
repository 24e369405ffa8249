//! POP3 command grammar (server side).
//!
//! Parses one already-delimited request line into a typed [`Command`],
//! gated by the current [`SessionState`]. The grammar is total: every
//! input line produces exactly one [`CommandParse`], never a panic.
//!
//! The grammar is a hand-written keyword dispatch followed by one typed
//! argument validator per command, which keeps this security-sensitive
//! boundary auditable line by line.

use thiserror::Error;

use crate::state::{Phase, SessionState};

/// One parsed client command with its typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `USER name` — identify the mailbox.
    User {
        /// Mailbox name.
        name: String,
    },
    /// `PASS string` — password for the pending USER.
    ///
    /// The argument is the remainder of the line: RFC 1939 section 7 allows
    /// passwords to contain spaces.
    Pass {
        /// Password, verbatim.
        password: String,
    },
    /// `APOP name digest` — digest authentication.
    Apop {
        /// Mailbox name.
        name: String,
        /// MD5 digest over the advertised challenge and the shared secret.
        digest: String,
    },
    /// `STAT` — maildrop summary.
    Stat,
    /// `LIST [msg]` — scan listing, whole maildrop or one message.
    List {
        /// Message number, or `None` for the whole maildrop.
        message: Option<u32>,
    },
    /// `UIDL [msg]` — unique-id listing, whole maildrop or one message.
    Uidl {
        /// Message number, or `None` for the whole maildrop.
        message: Option<u32>,
    },
    /// `RETR msg` — retrieve a message.
    Retr {
        /// Message number.
        message: u32,
    },
    /// `DELE msg` — mark a message as deleted.
    Dele {
        /// Message number.
        message: u32,
    },
    /// `TOP msg n` — headers plus the first `n` body lines.
    Top {
        /// Message number.
        message: u32,
        /// Number of body lines.
        lines: u32,
    },
    /// `NOOP` — no operation.
    Noop,
    /// `RSET` — unmark deleted messages.
    Rset,
    /// `QUIT` — end the session.
    Quit,
}

impl Command {
    /// The keyword this command was parsed from.
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        match self {
            Self::User { .. } => Keyword::User,
            Self::Pass { .. } => Keyword::Pass,
            Self::Apop { .. } => Keyword::Apop,
            Self::Stat => Keyword::Stat,
            Self::List { .. } => Keyword::List,
            Self::Uidl { .. } => Keyword::Uidl,
            Self::Retr { .. } => Keyword::Retr,
            Self::Dele { .. } => Keyword::Dele,
            Self::Top { .. } => Keyword::Top,
            Self::Noop => Keyword::Noop,
            Self::Rset => Keyword::Rset,
            Self::Quit => Keyword::Quit,
        }
    }
}

/// The twelve POP3 command keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// USER
    User,
    /// PASS
    Pass,
    /// APOP
    Apop,
    /// STAT
    Stat,
    /// LIST
    List,
    /// UIDL
    Uidl,
    /// RETR
    Retr,
    /// DELE
    Dele,
    /// TOP
    Top,
    /// NOOP
    Noop,
    /// RSET
    Rset,
    /// QUIT
    Quit,
}

impl Keyword {
    /// Case-insensitive keyword lookup.
    #[must_use]
    pub fn lookup(word: &str) -> Option<Self> {
        // Keywords are pure ASCII, so eq_ignore_ascii_case is exact.
        const TABLE: [(&str, Keyword); 12] = [
            ("USER", Keyword::User),
            ("PASS", Keyword::Pass),
            ("APOP", Keyword::Apop),
            ("STAT", Keyword::Stat),
            ("LIST", Keyword::List),
            ("UIDL", Keyword::Uidl),
            ("RETR", Keyword::Retr),
            ("DELE", Keyword::Dele),
            ("TOP", Keyword::Top),
            ("NOOP", Keyword::Noop),
            ("RSET", Keyword::Rset),
            ("QUIT", Keyword::Quit),
        ];
        TABLE
            .iter()
            .find(|(name, _)| word.eq_ignore_ascii_case(name))
            .map(|&(_, keyword)| keyword)
    }

    /// Canonical (upper-case) spelling of the keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Pass => "PASS",
            Self::Apop => "APOP",
            Self::Stat => "STAT",
            Self::List => "LIST",
            Self::Uidl => "UIDL",
            Self::Retr => "RETR",
            Self::Dele => "DELE",
            Self::Top => "TOP",
            Self::Noop => "NOOP",
            Self::Rset => "RSET",
            Self::Quit => "QUIT",
        }
    }
}

/// Broad class of a [`Rejection`], mirroring the error taxonomy:
/// syntax errors, wrong-phase errors and capability errors are all
/// client-correctable and keep the session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticClass {
    /// Malformed argument list.
    Syntax,
    /// Right syntax, wrong phase or ordering.
    State,
    /// Optional capability not offered by this server.
    Capability,
}

/// A recognized keyword that cannot be accepted, with a specific diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Missing, extra or malformed argument.
    #[error("invalid parameter")]
    InvalidParameter,
    /// Maildrop command before authentication completed.
    #[error("command is valid only in the TRANSACTION state")]
    OutsideTransaction,
    /// Authentication command after authentication completed.
    #[error("command is not valid in the TRANSACTION state")]
    InsideTransaction,
    /// APOP was requested but this server does not advertise it.
    #[error("APOP is not supported")]
    ApopUnsupported,
    /// USER or APOP while a USER name is already pending.
    #[error("USER already accepted, expected PASS")]
    UserAlreadyAccepted,
    /// PASS without a preceding accepted USER.
    #[error("PASS must follow a successful USER")]
    PassWithoutUser,
}

impl Rejection {
    /// The taxonomy class of this diagnostic.
    #[must_use]
    pub const fn class(self) -> DiagnosticClass {
        match self {
            Self::InvalidParameter => DiagnosticClass::Syntax,
            Self::OutsideTransaction
            | Self::InsideTransaction
            | Self::UserAlreadyAccepted
            | Self::PassWithoutUser => DiagnosticClass::State,
            Self::ApopUnsupported => DiagnosticClass::Capability,
        }
    }
}

/// Outcome of parsing one request line.
///
/// A genuine three-way sum: well-formed and legal, well-formed but refused
/// with a diagnostic, or conforming to no known grammar at all. Callers
/// must handle all three explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParse {
    /// Well-formed and legal in the current phase.
    Accepted(Command),
    /// Recognized keyword, refused: wrong phase, ordering, arity or type.
    Rejected(Rejection),
    /// Unrecognized keyword; the offending word is carried for diagnostics.
    Ambiguous(String),
}

/// Parses one request line against the current session state.
///
/// A trailing CRLF is tolerated and ignored, so both raw received lines and
/// scanner payloads (delimiter already removed) parse identically.
///
/// On a grammar-level USER success the state advances to
/// [`Phase::PasswordPending`] and records the pending name; every other
/// transition is the session driver's job because it depends on the
/// backend's verdict.
pub fn parse(line: &str, state: &mut SessionState) -> CommandParse {
    let line = line.strip_suffix("\r\n").unwrap_or(line);
    let mut cursor = Cursor::new(line);

    let Some(word) = cursor.token() else {
        return CommandParse::Ambiguous(String::new());
    };
    let Some(keyword) = Keyword::lookup(word) else {
        return CommandParse::Ambiguous(word.to_string());
    };

    match keyword {
        Keyword::User => parse_user(&mut cursor, state),
        Keyword::Pass => parse_pass(&mut cursor, state),
        Keyword::Apop => parse_apop(&mut cursor, state),
        Keyword::Stat => parse_stat(&mut cursor, state),
        Keyword::List => parse_optional_message(&mut cursor, state, |message| Command::List {
            message,
        }),
        Keyword::Uidl => parse_optional_message(&mut cursor, state, |message| Command::Uidl {
            message,
        }),
        Keyword::Retr => parse_one_message(&mut cursor, state, |message| Command::Retr { message }),
        Keyword::Dele => parse_one_message(&mut cursor, state, |message| Command::Dele { message }),
        Keyword::Top => parse_top(&mut cursor, state),
        Keyword::Noop => any_phase(&mut cursor, Command::Noop),
        Keyword::Rset => any_phase(&mut cursor, Command::Rset),
        Keyword::Quit => any_phase(&mut cursor, Command::Quit),
    }
}

/// `USER name`: legal only before any authentication has started.
fn parse_user(cursor: &mut Cursor<'_>, state: &mut SessionState) -> CommandParse {
    match state.phase() {
        Phase::Unauthenticated => {}
        Phase::PasswordPending => return CommandParse::Rejected(Rejection::UserAlreadyAccepted),
        Phase::Transaction | Phase::Closing => {
            return CommandParse::Rejected(Rejection::InsideTransaction);
        }
    }
    let Some(name) = cursor.token() else {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    };
    let name = name.to_string();
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    state.accept_user(name.clone());
    CommandParse::Accepted(Command::User { name })
}

/// `PASS string`: legal only while a USER name is pending.
fn parse_pass(cursor: &mut Cursor<'_>, state: &SessionState) -> CommandParse {
    match state.phase() {
        Phase::PasswordPending => {}
        Phase::Unauthenticated => return CommandParse::Rejected(Rejection::PassWithoutUser),
        Phase::Transaction | Phase::Closing => {
            return CommandParse::Rejected(Rejection::InsideTransaction);
        }
    }
    match cursor.remainder() {
        Some(password) if !password.is_empty() => CommandParse::Accepted(Command::Pass {
            password: password.to_string(),
        }),
        _ => CommandParse::Rejected(Rejection::InvalidParameter),
    }
}

/// `APOP name digest`: legal only when advertised and before authentication.
fn parse_apop(cursor: &mut Cursor<'_>, state: &SessionState) -> CommandParse {
    if !state.apop_supported() {
        return CommandParse::Rejected(Rejection::ApopUnsupported);
    }
    match state.phase() {
        Phase::Unauthenticated => {}
        Phase::PasswordPending => return CommandParse::Rejected(Rejection::UserAlreadyAccepted),
        Phase::Transaction | Phase::Closing => {
            return CommandParse::Rejected(Rejection::InsideTransaction);
        }
    }
    let (Some(name), Some(digest)) = (cursor.token(), cursor.token()) else {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    };
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    CommandParse::Accepted(Command::Apop {
        name: name.to_string(),
        digest: digest.to_string(),
    })
}

/// `TOP msg n`: exactly two unsigned arguments, transaction phase only.
fn parse_top(cursor: &mut Cursor<'_>, state: &SessionState) -> CommandParse {
    if !state.in_transaction() {
        return CommandParse::Rejected(Rejection::OutsideTransaction);
    }
    let (Some(message), Some(lines)) = (cursor.number(), cursor.number()) else {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    };
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    CommandParse::Accepted(Command::Top { message, lines })
}

/// LIST/UIDL: zero-or-one unsigned argument, transaction phase only.
fn parse_optional_message(
    cursor: &mut Cursor<'_>,
    state: &SessionState,
    build: impl FnOnce(Option<u32>) -> Command,
) -> CommandParse {
    if !state.in_transaction() {
        return CommandParse::Rejected(Rejection::OutsideTransaction);
    }
    if cursor.finished() {
        return CommandParse::Accepted(build(None));
    }
    let Some(message) = cursor.number() else {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    };
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    CommandParse::Accepted(build(Some(message)))
}

/// RETR/DELE: exactly one unsigned argument, transaction phase only.
fn parse_one_message(
    cursor: &mut Cursor<'_>,
    state: &SessionState,
    build: impl FnOnce(u32) -> Command,
) -> CommandParse {
    if !state.in_transaction() {
        return CommandParse::Rejected(Rejection::OutsideTransaction);
    }
    let Some(message) = cursor.number() else {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    };
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    CommandParse::Accepted(build(message))
}

/// `STAT`: no arguments, transaction phase only.
fn parse_stat(cursor: &mut Cursor<'_>, state: &SessionState) -> CommandParse {
    if !state.in_transaction() {
        return CommandParse::Rejected(Rejection::OutsideTransaction);
    }
    if !cursor.finished() {
        return CommandParse::Rejected(Rejection::InvalidParameter);
    }
    CommandParse::Accepted(Command::Stat)
}

/// NOOP/RSET/QUIT: legal in any phase, no arguments.
///
/// RSET outside the transaction phase is deliberately not a hard failure;
/// the driver forwards it to the backend regardless (RFC leniency).
fn any_phase(cursor: &mut Cursor<'_>, command: Command) -> CommandParse {
    if cursor.finished() {
        CommandParse::Accepted(command)
    } else {
        CommandParse::Rejected(Rejection::InvalidParameter)
    }
}

/// Cursor over one request line: keyword and space-separated arguments.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    const fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Next space-delimited token, or `None` at end of line.
    ///
    /// Consecutive spaces produce an empty token, which is reported as
    /// `None` so that `"LIST  1"` fails arity validation instead of
    /// silently skipping the gap.
    fn token(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let (token, rest) = match self.rest.split_once(' ') {
            Some((token, rest)) => (token, rest),
            None => (self.rest, ""),
        };
        self.rest = rest;
        if token.is_empty() { None } else { Some(token) }
    }

    /// Everything left on the line, consumed in one piece.
    fn remainder(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let rest = self.rest;
        self.rest = "";
        Some(rest)
    }

    /// Next token parsed as a strict decimal unsigned integer.
    fn number(&mut self) -> Option<u32> {
        let token = self.token()?;
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        token.parse().ok()
    }

    /// True once the whole line has been consumed.
    const fn finished(&self) -> bool {
        self.rest.is_empty()
    }
}
