//! Per-connection session engine.
//!
//! Drives one connection through the POP3 command/response cycle: scan a
//! bounded request line, parse it against the session state, dispatch to
//! the maildrop backend, and write the reply. The inactivity deadline
//! races only the read — it is reset before processing begins, so a slow
//! client is never cut off mid-command.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};

use popline_proto::{Command, CommandParse, SessionState, command};

use crate::backend::{AuthVerdict, MailDrop};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scanner::ScanOutcome;
use crate::stream::LineStream;

/// Whether the session loop keeps going after a dispatched command.
enum Flow {
    Continue,
    Quit,
}

/// One POP3 session over a duplex transport.
///
/// The session owns its stream, backend and state exclusively; it is
/// consumed by [`Session::run`] and destroyed on QUIT, timeout or fault.
pub struct Session<S, B> {
    stream: LineStream<S>,
    backend: B,
    state: SessionState,
    config: Config,
    session_id: u64,
    apop_challenge: Option<String>,
}

impl<S, B> Session<S, B>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    B: MailDrop,
{
    /// Creates a session for a freshly accepted connection.
    pub fn new(stream: S, backend: B, config: Config, session_id: u64) -> Self {
        let apop_challenge = config
            .advertise_apop
            .then(|| make_challenge(session_id));
        Self {
            stream: LineStream::new(stream),
            backend,
            state: SessionState::new(config.advertise_apop),
            config,
            session_id,
            apop_challenge,
        }
    }

    /// Runs the session to completion.
    ///
    /// Returns `Ok(())` for an orderly end (QUIT or client disconnect);
    /// timeouts, oversized lines, transport faults and backend failures
    /// surface as [`Error`] after a best-effort final `-ERR` where the
    /// transport is still writable. Nothing is ever retried.
    pub async fn run(mut self) -> Result<()> {
        self.greet().await?;

        loop {
            let read = self.stream.read_line(self.config.max_line_length);
            let scan = match tokio::time::timeout(self.config.timeout, read).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::debug!(session = self.session_id, "inactivity deadline fired");
                    let _ = self.stream.write_line("-ERR session timed out").await;
                    return Err(Error::Timeout(self.config.timeout));
                }
            };

            match scan.outcome {
                ScanOutcome::Delimited => {}
                ScanOutcome::Empty | ScanOutcome::EndOfInput => {
                    tracing::debug!(session = self.session_id, "client disconnected");
                    return Ok(());
                }
                ScanOutcome::Overflow => {
                    tracing::warn!(
                        session = self.session_id,
                        limit = self.config.max_line_length,
                        "request line too long"
                    );
                    let _ = self.stream.write_line("-ERR request line too long").await;
                    return Err(Error::LineTooLong {
                        limit: self.config.max_line_length,
                    });
                }
            }

            let Ok(line) = std::str::from_utf8(&scan.payload) else {
                self.stream.write_line("-ERR invalid command").await?;
                continue;
            };
            tracing::trace!(session = self.session_id, line, "request");

            match command::parse(line, &mut self.state) {
                CommandParse::Accepted(parsed) => {
                    tracing::debug!(
                        session = self.session_id,
                        keyword = parsed.keyword().as_str(),
                        "dispatch"
                    );
                    match self.dispatch(parsed).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => return Ok(()),
                        Err(error) => {
                            let _ = self
                                .stream
                                .write_line("-ERR server unavailable, try again later")
                                .await;
                            return Err(error);
                        }
                    }
                }
                CommandParse::Rejected(rejection) => {
                    tracing::debug!(session = self.session_id, %rejection, "rejected");
                    self.stream.write_line(&format!("-ERR {rejection}")).await?;
                }
                CommandParse::Ambiguous(word) => {
                    tracing::debug!(session = self.session_id, word, "unknown keyword");
                    self.stream.write_line("-ERR invalid command").await?;
                }
            }
        }
    }

    /// Writes the greeting, with the APOP challenge when advertised.
    async fn greet(&mut self) -> Result<()> {
        let banner = self.backend.banner().await;
        let line = match &self.apop_challenge {
            Some(challenge) => format!("+OK {banner} {challenge}"),
            None => format!("+OK {banner}"),
        };
        self.stream.write_line(&line).await
    }

    /// Invokes the backend operation for an accepted command and writes
    /// the reply. Only backend unavailability escapes as an error.
    async fn dispatch(&mut self, parsed: Command) -> Result<Flow> {
        match parsed {
            Command::User { .. } => {
                // The grammar recorded the pending name already.
                self.stream.write_line("+OK user accepted, send PASS").await?;
            }
            Command::Pass { password } => {
                // PASS is only accepted in the password-pending phase, so a
                // pending user is always present here.
                let user = self.state.pending_user().unwrap_or_default().to_string();
                match self.backend.authenticate(&user, &password).await? {
                    AuthVerdict::Accept => {
                        self.state.password_accepted();
                        self.stream.write_line("+OK maildrop locked and ready").await?;
                    }
                    AuthVerdict::Reject => {
                        self.state.password_rejected();
                        self.stream.write_line("-ERR authentication failed").await?;
                    }
                }
            }
            Command::Apop { name, digest } => {
                let challenge = self.apop_challenge.clone().unwrap_or_default();
                match self
                    .backend
                    .authenticate_apop(&name, &digest, &challenge)
                    .await?
                {
                    AuthVerdict::Accept => {
                        self.state.apop_accepted();
                        self.stream.write_line("+OK maildrop locked and ready").await?;
                    }
                    AuthVerdict::Reject => {
                        self.stream.write_line("-ERR authentication failed").await?;
                    }
                }
            }
            Command::Stat => {
                let stat = self.backend.stat().await?;
                self.stream
                    .write_line(&format!("+OK {} {}", stat.messages, stat.total_bytes))
                    .await?;
            }
            Command::List { message: Some(message) } => {
                match self.backend.list_one(message).await? {
                    Some(entry) => {
                        self.stream
                            .write_line(&format!("+OK {} {}", entry.message, entry.bytes))
                            .await?;
                    }
                    None => self.stream.write_line("-ERR no such message").await?,
                }
            }
            Command::List { message: None } => {
                let entries = self.backend.list_all().await?;
                let total: u64 = entries.iter().map(|entry| entry.bytes).sum();
                let status = format!("+OK {} messages ({total} octets)", entries.len());
                let body: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{} {}", entry.message, entry.bytes))
                    .collect();
                self.stream.write_multiline(&status, &body).await?;
            }
            Command::Uidl { message: Some(message) } => {
                match self.backend.uidl_one(message).await? {
                    Some(entry) => {
                        self.stream
                            .write_line(&format!("+OK {} {}", entry.message, entry.uid))
                            .await?;
                    }
                    None => self.stream.write_line("-ERR no such message").await?,
                }
            }
            Command::Uidl { message: None } => {
                let entries = self.backend.uidl_all().await?;
                let body: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{} {}", entry.message, entry.uid))
                    .collect();
                self.stream.write_multiline("+OK", &body).await?;
            }
            Command::Retr { message } => match self.backend.retrieve(message).await? {
                Some(body) => {
                    let octets = body_octets(&body);
                    self.stream
                        .write_multiline(&format!("+OK {octets} octets"), &body)
                        .await?;
                }
                None => self.stream.write_line("-ERR no such message").await?,
            },
            Command::Top { message, lines } => {
                match self.backend.top(message, lines).await? {
                    Some(body) => self.stream.write_multiline("+OK", &body).await?,
                    None => self.stream.write_line("-ERR no such message").await?,
                }
            }
            Command::Dele { message } => {
                if self.backend.delete(message).await? {
                    self.stream
                        .write_line(&format!("+OK message {message} deleted"))
                        .await?;
                } else {
                    self.stream.write_line("-ERR no such message").await?;
                }
            }
            Command::Rset => {
                self.backend.reset().await?;
                self.stream.write_line("+OK").await?;
            }
            Command::Noop => {
                self.backend.noop().await?;
                self.stream.write_line("+OK").await?;
            }
            Command::Quit => {
                // QUIT always gets a final reply and a shutdown, whatever
                // the backend says about committing deletions.
                let farewell = match self.backend.quit().await {
                    Ok(()) => "+OK popline POP3 server signing off",
                    Err(_) => "-ERR some deleted messages not removed",
                };
                self.state.close();
                self.stream.write_line(farewell).await?;
                let _ = self.stream.shutdown().await;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }
}

/// Builds the APOP challenge advertised in the greeting,
/// `<timestamp.session@host>`, matching the shape clients extract.
fn make_challenge(session_id: u64) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    format!("<{timestamp}.{session_id}@popline>")
}

/// Size of a message body on the wire, CRLF per line included.
fn body_octets(body: &[String]) -> u64 {
    body.iter().map(|line| line.len() as u64 + 2).sum()
}
