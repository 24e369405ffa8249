//! TCP acceptor.
//!
//! Accepts connections and spawns one task per session; each task owns its
//! stream, backend and state outright, so sessions never share anything
//! and need no locking. An accept error is logged and the loop keeps
//! serving.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::Instrument;

use crate::backend::MailDrop;
use crate::config::Config;
use crate::error::Result;
use crate::session::Session;

/// POP3 server: a configuration plus a per-connection backend factory.
///
/// The factory runs once per accepted connection and gets the peer
/// address; the backend it returns lives exactly as long as the session.
pub struct Server<F> {
    config: Config,
    factory: F,
    next_session: AtomicU64,
}

impl<F, B> Server<F>
where
    F: Fn(SocketAddr) -> B,
    B: MailDrop + 'static,
{
    /// Creates a server with the given configuration and backend factory.
    pub fn new(config: Config, factory: F) -> Self {
        Self {
            config,
            factory,
            next_session: AtomicU64::new(1),
        }
    }

    /// Binds a listener on `addr` and serves until the task is dropped.
    pub async fn bind(self, addr: impl ToSocketAddrs + Send) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(%local, "listening");

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                    continue;
                }
            };

            let session_id = self.next_session.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(session = session_id, %peer, "connection accepted");

            let backend = (self.factory)(peer);
            let session = Session::new(stream, backend, self.config.clone(), session_id);
            let span = tracing::debug_span!("session", id = session_id, %peer);
            tokio::spawn(
                async move {
                    if let Err(error) = session.run().await {
                        tracing::debug!(%error, "session ended with error");
                    }
                }
                .instrument(span),
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    use popline_proto::{ListEntry, Stat, UidlEntry};

    use crate::backend::{AuthVerdict, BackendError};

    use super::*;

    use std::result::Result;

    struct EmptyDrop;

    impl MailDrop for EmptyDrop {
        fn authenticate(
            &mut self,
            _user: &str,
            _password: &str,
        ) -> impl Future<Output = Result<AuthVerdict, BackendError>> + Send {
            async { Ok(AuthVerdict::Accept) }
        }
        fn stat(&mut self) -> impl Future<Output = Result<Stat, BackendError>> + Send {
            async {
                Ok(Stat {
                    messages: 0,
                    total_bytes: 0,
                })
            }
        }
        fn list_all(&mut self) -> impl Future<Output = Result<Vec<ListEntry>, BackendError>> + Send {
            async { Ok(Vec::new()) }
        }
        fn list_one(
            &mut self,
            _message: u32,
        ) -> impl Future<Output = Result<Option<ListEntry>, BackendError>> + Send {
            async { Ok(None) }
        }
        fn uidl_all(&mut self) -> impl Future<Output = Result<Vec<UidlEntry>, BackendError>> + Send {
            async { Ok(Vec::new()) }
        }
        fn uidl_one(
            &mut self,
            _message: u32,
        ) -> impl Future<Output = Result<Option<UidlEntry>, BackendError>> + Send {
            async { Ok(None) }
        }
        fn retrieve(
            &mut self,
            _message: u32,
        ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
            async { Ok(None) }
        }
        fn top(
            &mut self,
            _message: u32,
            _lines: u32,
        ) -> impl Future<Output = Result<Option<Vec<String>>, BackendError>> + Send {
            async { Ok(None) }
        }
        fn delete(
            &mut self,
            _message: u32,
        ) -> impl Future<Output = Result<bool, BackendError>> + Send {
            async { Ok(false) }
        }
        fn reset(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
            async { Ok(()) }
        }
        fn quit(&mut self) -> impl Future<Output = Result<(), BackendError>> + Send {
            async { Ok(()) }
        }
    }

    async fn read_reply(reader: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line
    }

    #[tokio::test]
    async fn test_accepts_and_serves_a_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(Config::default(), |_peer| EmptyDrop);
        tokio::spawn(server.serve(listener));

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut reader = BufReader::new(stream);

        let greeting = read_reply(&mut reader).await;
        assert!(greeting.starts_with("+OK"), "greeting: {greeting}");

        reader.get_mut().write_all(b"QUIT\r\n").await.unwrap();
        let farewell = read_reply(&mut reader).await;
        assert!(farewell.starts_with("+OK"), "farewell: {farewell}");

        // Server shut the connection down after QUIT.
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_get_distinct_challenges() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(Config::default(), |_peer| EmptyDrop);
        tokio::spawn(server.serve(listener));

        let mut first = BufReader::new(TcpStream::connect(addr).await.unwrap());
        let mut second = BufReader::new(TcpStream::connect(addr).await.unwrap());

        let one = read_reply(&mut first).await;
        let two = read_reply(&mut second).await;
        assert_ne!(one, two);
    }
}
