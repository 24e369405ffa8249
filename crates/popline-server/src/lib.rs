//! # popline-server
//!
//! Async POP3 server runtime on top of [`popline_proto`]: a bounded
//! boundary scanner, a line-oriented stream wrapper, a per-connection
//! session engine, and a TCP acceptor. Storage and credential checking
//! live behind the [`MailDrop`] trait; the engine itself holds no
//! mailbox state.
//!
//! ## Features
//!
//! - **Task-per-connection**: each session exclusively owns its stream,
//!   backend and state, so there is no shared session table and no locks
//! - **Bounded reads**: request lines are scanned with a hard length
//!   ceiling; an oversized line ends the session instead of growing memory
//! - **Inactivity timeout**: the autologout timer races only the read and
//!   resets before a command is processed
//! - **Dot-stuffed replies**: multi-line responses are stuffed and
//!   terminated by the stream layer, never by backends
//!
//! ## Quick Start
//!
//! ```no_run
//! use popline_server::{Config, Server};
//! # use popline_server::{AuthVerdict, BackendError, MailDrop};
//! # use popline_proto::{ListEntry, Stat, UidlEntry};
//! # struct MyDrop;
//! # impl MailDrop for MyDrop {
//! #     fn authenticate(&mut self, _: &str, _: &str) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send { async { Ok(AuthVerdict::Reject) } }
//! #     fn stat(&mut self) -> impl Future<Output = Result<Stat, BackendError>> + Send { async { Ok(Stat { messages: 0, total_bytes: 0 }) } }
//! #     fn list_all(&mut self) -> impl Future<Output = Result<Vec<ListEntry>, BackendError>> + Send { async { Ok(Vec::new()) } }
//! #     fn list_one(&mut self, _: u32) -> impl Future<Output = Result<Option<ListEntry>, BackendError>> + Send { async { Ok(None) } }
//! #     fn uidl_all(&mut self) -> impl Future<Output = Result<Vec<UidlEntry>, BackendError>> + Send { async { Ok(Vec::new()) } }
//! #     fn uidl_one(&mut self, _: u32) -> impl Future<Output = Result<Option<UidlEntry>, BackendError>> + Send { async { Ok(None) } }
//! #     fn retrieve(&mut self, _: u32) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send { async { Ok(None) } }
//! #     fn top(&mut self, _: u32, _: u32) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send { async { Ok(None) } }
//! #     fn delete(&mut self, _: u32) -> impl Future<Output = Result<bool, BackendError>> + Send { async { Ok(false) } }
//! #     fn reset(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send { async { Ok(()) } }
//! #     fn quit(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send { async { Ok(()) } }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> popline_server::Result<()> {
//!     let server = Server::new(Config::default(), |_peer| MyDrop);
//!     server.bind("0.0.0.0:110").await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`scanner`]: delimiter-bounded reads with a rolling-checksum matcher
//! - [`stream`]: CRLF line reads and dot-stuffed reply writes
//! - [`backend`]: the maildrop capability trait
//! - [`session`]: the per-connection command/response engine
//! - [`server`]: the TCP acceptor
//! - [`config`]: timeouts, APOP advertisement, line-length ceiling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod error;
pub mod scanner;
pub mod server;
pub mod session;
pub mod stream;

pub use backend::{AuthVerdict, BackendError, MailDrop};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use scanner::{Scan, ScanOutcome, scan_until};
pub use server::Server;
pub use session::Session;
pub use stream::LineStream;
