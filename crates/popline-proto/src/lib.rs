//! # popline-proto
//!
//! Sans-I/O POP3 protocol layer implementing RFC 1939: the server-side
//! command grammar, the client-side response grammars, and the session
//! state machine. No sockets, no async — every function here operates on
//! already-materialized lines, which keeps the grammars testable in
//! isolation and reusable from any I/O driver.
//!
//! ## Features
//!
//! - **Total command grammar**: every request line produces exactly one
//!   [`CommandParse`] — accepted, rejected with a specific diagnostic, or
//!   ambiguous — never a panic and never an unhandled case
//! - **Three-way parse outcomes**: `-ERR` (recognized but negative) is
//!   never collapsed into "malformed"; ambiguity means the peer cannot
//!   be trusted and is always surfaced to the caller
//! - **Phase gating**: the grammar consults the [`SessionState`] so that
//!   maildrop commands are only accepted in the transaction phase
//! - **APOP**: challenge extraction from the greeting and digest-command
//!   parsing when the capability is advertised
//!
//! ## Quick Start
//!
//! ```
//! use popline_proto::{parse, Command, CommandParse, SessionState};
//!
//! let mut state = SessionState::new(false);
//! match parse("USER alice\r\n", &mut state) {
//!     CommandParse::Accepted(Command::User { name }) => assert_eq!(name, "alice"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: server-side request-line grammar
//! - [`response`]: client-side response-line grammars
//! - [`state`]: session phase machine
//! - [`types`]: shared wire-level types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod response;
pub mod state;
pub mod types;

pub use command::{Command, CommandParse, DiagnosticClass, Keyword, Rejection, parse};
pub use response::{BodyLine, ParseOutcome};
pub use state::{Phase, SessionState};
pub use types::{Greeting, ListEntry, Stat, UidlEntry};

/// POP3 protocol version supported.
pub const POP3_VERSION: &str = "POP3 (RFC 1939)";
