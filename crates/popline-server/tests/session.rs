//! End-to-end session tests over an in-memory duplex transport.

#![allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::similar_names
)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use popline_proto::{ListEntry, ParseOutcome, Stat, UidlEntry, response};
use popline_server::{AuthVerdict, BackendError, Config, Error, MailDrop, Session};

/// One maildrop message: unique id and unstuffed content lines.
struct Message {
    uid: &'static str,
    lines: Vec<&'static str>,
    deleted: bool,
}

impl Message {
    fn octets(&self) -> u64 {
        self.lines.iter().map(|line| line.len() as u64 + 2).sum()
    }
}

/// Scripted in-memory backend that records every call it receives.
struct TestDrop {
    password: &'static str,
    messages: Vec<Message>,
    calls: Arc<Mutex<Vec<String>>>,
    challenge_seen: Arc<Mutex<Option<String>>>,
}

impl TestDrop {
    fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            password: "sesame",
            messages: vec![
                Message {
                    uid: "whqtswO00WBw418f9t5JxYwZ",
                    lines: vec!["From: alice", "", "hello"],
                    deleted: false,
                },
                Message {
                    uid: "QhdPYR:00WBw1Ph7x7",
                    lines: vec!["From: bob", "", ".hidden line", "bye"],
                    deleted: false,
                },
            ],
            calls,
            challenge_seen: Arc::new(Mutex::new(None)),
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn live(&self, message: u32) -> Option<&Message> {
        let index = usize::try_from(message).ok()?.checked_sub(1)?;
        self.messages.get(index).filter(|msg| !msg.deleted)
    }
}

impl MailDrop for TestDrop {
    fn banner(&self) -> impl Future<Output = String> + Send {
        async { String::from("test maildrop ready") }
    }

    fn authenticate(
        &mut self,
        user: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send {
        self.record(format!("authenticate {user}"));
        let verdict = if password == self.password {
            AuthVerdict::Accept
        } else {
            AuthVerdict::Reject
        };
        async move { Ok(verdict) }
    }

    fn authenticate_apop(
        &mut self,
        user: &str,
        _digest: &str,
        challenge: &str,
    ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send {
        self.record(format!("apop {user}"));
        *self.challenge_seen.lock().unwrap() = Some(challenge.to_string());
        async { Ok(AuthVerdict::Accept) }
    }

    fn stat(&mut self) -> impl Future<Output = Result<Stat, BackendError>> + Send {
        self.record("stat");
        let live: Vec<&Message> = self.messages.iter().filter(|msg| !msg.deleted).collect();
        let stat = Stat {
            messages: live.len() as u32,
            total_bytes: live.iter().map(|msg| msg.octets()).sum(),
        };
        async move { Ok(stat) }
    }

    fn list_all(&mut self) -> impl Future<Output = Result<Vec<ListEntry>, BackendError>> + Send {
        self.record("list_all");
        let entries: Vec<ListEntry> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, msg)| !msg.deleted)
            .map(|(index, msg)| ListEntry {
                message: index as u32 + 1,
                bytes: msg.octets(),
            })
            .collect();
        async move { Ok(entries) }
    }

    fn list_one(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<ListEntry>, BackendError>> + Send {
        self.record(format!("list_one {message}"));
        let entry = self.live(message).map(|msg| ListEntry {
            message,
            bytes: msg.octets(),
        });
        async move { Ok(entry) }
    }

    fn uidl_all(&mut self) -> impl Future<Output = Result<Vec<UidlEntry>, BackendError>> + Send {
        self.record("uidl_all");
        let entries: Vec<UidlEntry> = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, msg)| !msg.deleted)
            .map(|(index, msg)| UidlEntry {
                message: index as u32 + 1,
                uid: msg.uid.to_string(),
            })
            .collect();
        async move { Ok(entries) }
    }

    fn uidl_one(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<UidlEntry>, BackendError>> + Send {
        self.record(format!("uidl_one {message}"));
        let entry = self.live(message).map(|msg| UidlEntry {
            message,
            uid: msg.uid.to_string(),
        });
        async move { Ok(entry) }
    }

    fn retrieve(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
        self.record(format!("retrieve {message}"));
        let body = self
            .live(message)
            .map(|msg| msg.lines.iter().map(|line| (*line).to_string()).collect());
        async move { Ok(body) }
    }

    fn top(
        &mut self,
        message: u32,
        lines: u32,
    ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
        self.record(format!("top {message} {lines}"));
        let body = self.live(message).map(|msg| {
            let headers = msg.lines.iter().take_while(|line| !line.is_empty());
            let body_lines = msg
                .lines
                .iter()
                .skip_while(|line| !line.is_empty())
                .take(lines as usize + 1);
            headers
                .chain(body_lines)
                .map(|line| (*line).to_string())
                .collect()
        });
        async move { Ok(body) }
    }

    fn delete(
        &mut self,
        message: u32,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send {
        self.record(format!("delete {message}"));
        let found = match usize::try_from(message)
            .ok()
            .and_then(|m| m.checked_sub(1))
            .and_then(|index| self.messages.get_mut(index))
        {
            Some(msg) if !msg.deleted => {
                msg.deleted = true;
                true
            }
            _ => false,
        };
        async move { Ok(found) }
    }

    fn reset(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
        self.record("reset");
        for msg in &mut self.messages {
            msg.deleted = false;
        }
        async { Ok(()) }
    }

    fn quit(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
        self.record("quit");
        async { Ok(()) }
    }
}

struct Client {
    reader: BufReader<DuplexStream>,
}

impl Client {
    async fn send(&mut self, line: &str) {
        self.reader
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line
    }

    /// Reads a multi-line body up to and including the lone-period line,
    /// returning the raw (still stuffed) lines without their CRLFs.
    async fn body(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.reply().await;
            if response::is_terminator(&line) {
                return lines;
            }
            lines.push(line.trim_end_matches("\r\n").to_string());
        }
    }
}

fn spawn_session(
    config: Config,
) -> (Client, Arc<Mutex<Vec<String>>>, JoinHandle<Result<(), Error>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = TestDrop::new(Arc::clone(&calls));
    let (client_side, server_side) = tokio::io::duplex(4096);
    let session = Session::new(server_side, backend, config, 7);
    let handle = tokio::spawn(session.run());
    (
        Client {
            reader: BufReader::new(client_side),
        },
        calls,
        handle,
    )
}

#[tokio::test]
async fn test_full_user_pass_transaction_flow() {
    let (mut client, calls, handle) = spawn_session(Config::default());

    let greeting = client.reply().await;
    assert!(greeting.starts_with("+OK test maildrop ready <"));

    client.send("USER alice").await;
    assert!(client.reply().await.starts_with("+OK"));
    client.send("PASS sesame").await;
    assert!(client.reply().await.starts_with("+OK"));

    client.send("STAT").await;
    assert_eq!(client.reply().await, "+OK 2 54\r\n");

    client.send("LIST").await;
    assert_eq!(client.reply().await, "+OK 2 messages (54 octets)\r\n");
    assert_eq!(client.body().await, vec!["1 22", "2 32"]);

    client.send("LIST 2").await;
    assert_eq!(client.reply().await, "+OK 2 32\r\n");

    client.send("RETR one").await;
    assert_eq!(client.reply().await, "-ERR invalid parameter\r\n");

    client.send("DELE 1").await;
    assert_eq!(client.reply().await, "+OK message 1 deleted\r\n");
    client.send("STAT").await;
    assert_eq!(client.reply().await, "+OK 1 32\r\n");

    client.send("RSET").await;
    assert_eq!(client.reply().await, "+OK\r\n");
    client.send("STAT").await;
    assert_eq!(client.reply().await, "+OK 2 54\r\n");

    client.send("QUIT").await;
    assert!(client.reply().await.starts_with("+OK"));

    // Nothing follows the farewell.
    let mut rest = Vec::new();
    client.reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    handle.await.unwrap().unwrap();
    assert_eq!(calls.lock().unwrap().last().unwrap(), "quit");
}

#[tokio::test]
async fn test_retr_body_is_dot_stuffed_on_the_wire() {
    let (mut client, _calls, _handle) = spawn_session(Config::default());
    client.reply().await;

    client.send("USER alice").await;
    client.reply().await;
    client.send("PASS sesame").await;
    client.reply().await;

    client.send("RETR 2").await;
    assert_eq!(client.reply().await, "+OK 32 octets\r\n");
    // The line that starts with a period arrives doubled.
    assert_eq!(
        client.body().await,
        vec!["From: bob", "", "..hidden line", "bye"]
    );
}

#[tokio::test]
async fn test_top_returns_headers_and_requested_lines() {
    let (mut client, _calls, _handle) = spawn_session(Config::default());
    client.reply().await;

    client.send("USER alice").await;
    client.reply().await;
    client.send("PASS sesame").await;
    client.reply().await;

    client.send("TOP 1 0").await;
    assert!(client.reply().await.starts_with("+OK"));
    assert_eq!(client.body().await, vec!["From: alice", ""]);

    client.send("TOP 9 0").await;
    assert_eq!(client.reply().await, "-ERR no such message\r\n");
}

#[tokio::test]
async fn test_uidl_listing_and_unknown_message() {
    let (mut client, _calls, _handle) = spawn_session(Config::default());
    client.reply().await;

    client.send("USER alice").await;
    client.reply().await;
    client.send("PASS sesame").await;
    client.reply().await;

    client.send("UIDL").await;
    assert_eq!(client.reply().await, "+OK\r\n");
    assert_eq!(
        client.body().await,
        vec!["1 whqtswO00WBw418f9t5JxYwZ", "2 QhdPYR:00WBw1Ph7x7"]
    );

    client.send("UIDL 1").await;
    assert_eq!(client.reply().await, "+OK 1 whqtswO00WBw418f9t5JxYwZ\r\n");
    client.send("UIDL 3").await;
    assert_eq!(client.reply().await, "-ERR no such message\r\n");
}

#[tokio::test]
async fn test_rejected_commands_never_reach_the_backend() {
    let (mut client, calls, _handle) = spawn_session(Config::default());
    client.reply().await;

    client.send("STAT").await;
    assert_eq!(
        client.reply().await,
        "-ERR command is valid only in the TRANSACTION state\r\n"
    );
    client.send("PASS sesame").await;
    assert_eq!(
        client.reply().await,
        "-ERR PASS must follow a successful USER\r\n"
    );
    client.send("FOO bar").await;
    assert_eq!(client.reply().await, "-ERR invalid command\r\n");
    client.send("RETR 1").await;
    assert_eq!(
        client.reply().await,
        "-ERR command is valid only in the TRANSACTION state\r\n"
    );

    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_password_returns_to_start() {
    let (mut client, _calls, _handle) = spawn_session(Config::default());
    client.reply().await;

    client.send("USER alice").await;
    client.reply().await;
    client.send("PASS wrong").await;
    assert_eq!(client.reply().await, "-ERR authentication failed\r\n");

    // Back at the start: a fresh USER/PASS pair succeeds.
    client.send("USER alice").await;
    client.reply().await;
    client.send("PASS sesame").await;
    assert!(client.reply().await.starts_with("+OK"));
}

#[tokio::test]
async fn test_apop_receives_the_advertised_challenge() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let backend = TestDrop::new(Arc::clone(&calls));
    let challenge_seen = Arc::clone(&backend.challenge_seen);
    let (client_side, server_side) = tokio::io::duplex(4096);
    let _handle = tokio::spawn(Session::new(server_side, backend, Config::default(), 7).run());
    let mut client = Client {
        reader: BufReader::new(client_side),
    };

    let greeting = client.reply().await;
    let ParseOutcome::Accepted(parsed) = response::parse_greeting(&greeting) else {
        panic!("greeting not recognized: {greeting}");
    };
    let challenge = parsed.apop_challenge.unwrap();

    client
        .send("APOP alice c4c9334bac560ecc979e58001b3e22fb")
        .await;
    assert!(client.reply().await.starts_with("+OK"));
    assert_eq!(calls.lock().unwrap().as_slice(), ["apop alice"]);

    client.send("STAT").await;
    assert!(client.reply().await.starts_with("+OK"), "APOP unlocked the transaction phase");

    // The backend saw the exact challenge from the greeting.
    assert_eq!(challenge_seen.lock().unwrap().as_deref(), Some(challenge.as_str()));
}

#[tokio::test]
async fn test_apop_rejected_when_not_advertised() {
    let config = Config::builder().advertise_apop(false).build();
    let (mut client, calls, _handle) = spawn_session(config);

    let greeting = client.reply().await;
    assert!(!greeting.contains('<'));

    client
        .send("APOP alice c4c9334bac560ecc979e58001b3e22fb")
        .await;
    assert_eq!(client.reply().await, "-ERR APOP is not supported\r\n");
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_inactivity_timeout_ends_the_session() {
    let config = Config::builder().timeout(Duration::from_secs(30)).build();
    let (mut client, _calls, handle) = spawn_session(config);
    client.reply().await;

    // Send nothing; the paused clock auto-advances to the deadline.
    assert_eq!(client.reply().await, "-ERR session timed out\r\n");
    assert!(matches!(handle.await.unwrap(), Err(Error::Timeout(_))));
}

#[tokio::test]
async fn test_oversized_request_line_ends_the_session() {
    let config = Config::builder().max_line_length(16).build();
    let (mut client, _calls, handle) = spawn_session(config);
    client.reply().await;

    client.send(&"X".repeat(64)).await;
    assert_eq!(client.reply().await, "-ERR request line too long\r\n");
    assert!(matches!(
        handle.await.unwrap(),
        Err(Error::LineTooLong { limit: 16 })
    ));
}

#[tokio::test]
async fn test_disconnect_without_quit_commits_nothing() {
    let (client, calls, handle) = spawn_session(Config::default());
    drop(client);

    handle.await.unwrap().unwrap();
    assert!(!calls.lock().unwrap().iter().any(|call| call == "quit"));
}
