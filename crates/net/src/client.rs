//! TCP client for the booking server

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::ReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame, write_loop};
use crate::protocol::{BookingEvent, Message, Reply, Request};

/// How long to wait for the handshake or a reply
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How often an otherwise quiet client pings, well inside the server's idle timeout
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Requests waiting for a reply; `closed` once the reader has stopped
#[derive(Default)]
struct PendingReplies {
    waiting: HashMap<u64, oneshot::Sender<Reply>>,
    closed: bool,
}

type Pending = Arc<Mutex<PendingReplies>>;

/// Event pushed by the server
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A reservation changed (admin subscribers only)
    Booking(BookingEvent),
    /// Events were dropped because this client fell behind
    Lagged { missed: u64 },
    Subscribed,
    Rejected { reason: String },
    ServerShutdown,
    /// Connection lost
    Disconnected,
}

/// Client handle for network operations
pub struct Client {
    session_id: Uuid,
    admin: bool,
    next_id: AtomicU64,
    pending: Pending,
    out_tx: mpsc::Sender<Message>,
    event_rx: mpsc::Receiver<ClientEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    keepalive: JoinHandle<()>,
}

impl Client {
    /// Connect and perform the `Hello` handshake
    pub async fn connect(
        addr: SocketAddr,
        name: impl Into<String>,
        admin_token: Option<String>,
    ) -> Result<Self> {
        info!(addr = %addr, admin = admin_token.is_some(), "Connecting to server");

        let stream = TcpStream::connect(addr).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);

        let hello = Message::Hello {
            client: name.into(),
            admin_token,
        };
        write_frame(&mut writer, &hello).await?;

        let answer = tokio::time::timeout(REQUEST_TIMEOUT, read_frame(&mut reader))
            .await
            .map_err(|_| Error::Timeout)??;

        let (session_id, admin) = match answer {
            Message::Welcome { session_id, admin } => (session_id, admin),
            Message::Rejected { reason } => {
                warn!(reason = %reason, "Connection rejected");
                return Err(Error::Rejected(reason));
            }
            other => {
                return Err(Error::Protocol(format!(
                    "Expected Welcome, got {:?}",
                    other
                )))
            }
        };

        info!(session_id = %session_id, admin, "Connected");

        let pending: Pending = Arc::new(Mutex::new(PendingReplies::default()));
        let (out_tx, out_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);

        let writer = tokio::spawn(write_loop(writer, out_rx));
        let reader = tokio::spawn(read_loop(reader, pending.clone(), event_tx));
        let keepalive = tokio::spawn(keepalive_loop(out_tx.clone(), KEEPALIVE_INTERVAL));

        Ok(Client {
            session_id,
            admin,
            next_id: AtomicU64::new(1),
            pending,
            out_tx,
            event_rx,
            reader,
            writer,
            keepalive,
        })
    }

    /// Ping at `interval` instead of [`KEEPALIVE_INTERVAL`]
    pub fn with_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive.abort();
        self.keepalive = tokio::spawn(keepalive_loop(self.out_tx.clone(), interval));
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Send a request and wait for its reply. Error replies become
    /// [`Error::Remote`].
    pub async fn request(&self, body: Request) -> Result<Reply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(Error::ConnectionClosed);
            }
            pending.waiting.insert(id, tx);
        }

        if self
            .out_tx
            .send(Message::Request { id, body })
            .await
            .is_err()
        {
            self.pending.lock().await.waiting.remove(&id);
            return Err(Error::ConnectionClosed);
        }

        let reply = match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(Error::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.waiting.remove(&id);
                return Err(Error::Timeout);
            }
        };

        match reply {
            Reply::Error { code, message } => Err(Error::Remote { code, message }),
            reply => Ok(reply),
        }
    }

    /// Start receiving booking events. Returns once the server confirms.
    pub async fn subscribe(&mut self) -> Result<()> {
        if !self.admin {
            return Err(Error::Rejected(
                "Subscriptions require an admin session".into(),
            ));
        }

        self.out_tx
            .send(Message::Subscribe)
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        loop {
            let event = tokio::time::timeout(REQUEST_TIMEOUT, self.event_rx.recv())
                .await
                .map_err(|_| Error::Timeout)?;
            match event {
                Some(ClientEvent::Subscribed) => return Ok(()),
                Some(ClientEvent::Rejected { reason }) => return Err(Error::Rejected(reason)),
                Some(ClientEvent::ServerShutdown) | Some(ClientEvent::Disconnected) | None => {
                    return Err(Error::ConnectionClosed)
                }
                Some(other) => debug!(event = ?other, "Skipping event while subscribing"),
            }
        }
    }

    /// Get the next server event
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.out_tx
            .send(Message::Ping)
            .await
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Close the connection
    pub fn disconnect(self) {
        debug!(session_id = %self.session_id, "Disconnecting");
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.keepalive.abort();
    }
}

/// Keepalive task - pings so a listening subscriber is not closed as idle
async fn keepalive_loop(out_tx: mpsc::Sender<Message>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        if out_tx.send(Message::Ping).await.is_err() {
            break;
        }
    }
}

/// Reader task - routes replies to waiting requests and everything else to events
async fn read_loop(
    mut reader: ReadHalf<TcpStream>,
    pending: Pending,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    loop {
        let msg = match read_frame(&mut reader).await {
            Ok(msg) => msg,
            Err(Error::ConnectionClosed) => {
                debug!("Server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        };

        let event = match msg {
            Message::Response { id, body } => {
                match pending.lock().await.waiting.remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(body);
                    }
                    None => debug!(id, "Reply for unknown request"),
                }
                continue;
            }
            Message::Event(event) => ClientEvent::Booking(event),
            Message::Lagged { missed } => ClientEvent::Lagged { missed },
            Message::Subscribed => ClientEvent::Subscribed,
            Message::Rejected { reason } => ClientEvent::Rejected { reason },
            Message::ServerShutdown => ClientEvent::ServerShutdown,
            Message::Pong => {
                debug!("Received pong");
                continue;
            }
            _ => {
                debug!("Ignoring unexpected message");
                continue;
            }
        };

        // Never block replies behind an unread event queue
        if let Err(e) = event_tx.try_send(event) {
            warn!(error = %e, "Dropping server event");
        }
    }

    // Waiting requests see their sender dropped
    {
        let mut pending = pending.lock().await;
        pending.closed = true;
        pending.waiting.clear();
    }
    let _ = event_tx.send(ClientEvent::Disconnected).await;
    info!("Disconnected from server");
}
