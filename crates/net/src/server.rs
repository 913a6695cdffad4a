//! TCP server for the booking desk
//!
//! Each connection is a session: a `Hello` handshake, then requests answered
//! in order. Requests run on a blocking thread with the desk locked, so
//! writes are serialized and a slot can only be taken once. Admin sessions
//! may subscribe to booking events.
//!
//! Open sockets are capped separately from sessions: a connection holds a
//! permit from accept until it closes, and has a short window to say `Hello`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Local;
use tokio::io::ReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use venue_core::{BookingDesk, Database};

use crate::dispatch;
use crate::error::{Error, Result};
use crate::frame::{read_frame, write_loop};
use crate::protocol::{BookingEvent, ErrorCode, Message, Reply, Request};

/// Maximum number of concurrent sessions
pub const MAX_SESSIONS: usize = 64;

/// Sessions with no traffic for this long are closed
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Time a new connection has to send `Hello`
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connections allowed to be mid-handshake on top of the session cap
const HANDSHAKE_BACKLOG: usize = 16;

/// Events buffered per subscriber before it is told it lagged
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Token a client must present in `Hello` to get an admin session
    pub admin_token: String,
    pub max_sessions: usize,
    /// Open sockets, handshaking or not
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl ServerOptions {
    pub fn new(admin_token: impl Into<String>) -> Self {
        Self {
            admin_token: admin_token.into(),
            max_sessions: MAX_SESSIONS,
            max_connections: MAX_SESSIONS + HANDSHAKE_BACKLOG,
            idle_timeout: IDLE_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }
}

/// Connected session
struct Session {
    client: String,
    admin: bool,
    addr: SocketAddr,
}

/// Server state shared across tasks
struct ServerState {
    desk: Mutex<BookingDesk<Database>>,
    options: ServerOptions,
    sessions: RwLock<HashMap<Uuid, Session>>,
    connections: Arc<Semaphore>,
    events: broadcast::Sender<BookingEvent>,
}

impl ServerState {
    /// Lock the desk, recovering it if a request panicked while holding it.
    /// Every request is its own statement or transaction, so nothing is
    /// left half-written.
    fn lock_desk(&self) -> MutexGuard<'_, BookingDesk<Database>> {
        self.desk.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering booking desk after a failed request");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// Booking server handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving the desk
    pub async fn start(
        bind: SocketAddr,
        desk: BookingDesk<Database>,
        options: ServerOptions,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, max_sessions = options.max_sessions, "Server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let state = Arc::new(ServerState {
            desk: Mutex::new(desk),
            connections: Arc::new(Semaphore::new(options.max_connections)),
            options,
            sessions: RwLock::new(HashMap::new()),
            events,
        });

        tokio::spawn(accept_loop(listener, state.clone(), shutdown_tx.clone()));

        Ok(Server {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of sessions past the handshake
    pub async fn session_count(&self) -> usize {
        self.state.sessions.read().await.len()
    }

    /// Tell every session the server is going away and stop accepting
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let Ok(permit) = state.connections.clone().try_acquire_owned() else {
                            warn!(addr = %addr, "Too many connections, dropping");
                            drop(stream);
                            continue;
                        };
                        debug!(addr = %addr, "New connection");
                        let state = state.clone();
                        let shutdown_rx = shutdown_tx.subscribe();
                        tokio::spawn(handle_connection(stream, addr, state, shutdown_rx, permit));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
    mut shutdown_rx: broadcast::Receiver<()>,
    _permit: OwnedSemaphorePermit,
) {
    let (mut reader, writer) = tokio::io::split(stream);
    let (msg_tx, msg_rx) = mpsc::channel(64);
    let writer_handle = tokio::spawn(write_loop(writer, msg_rx));

    let (session_id, admin) = match handshake(&mut reader, addr, &state).await {
        Ok(session) => session,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Handshake failed");
            if let Error::Rejected(reason) = e {
                let _ = msg_tx.send(Message::Rejected { reason }).await;
            }
            drop(msg_tx);
            let _ = writer_handle.await;
            return;
        }
    };

    info!(addr = %addr, session_id = %session_id, admin, "Session opened");
    let _ = msg_tx.send(Message::Welcome { session_id, admin }).await;

    // Reads run in their own task so a half-read frame is never dropped by select!
    let (frame_tx, mut frame_rx) = mpsc::channel(16);
    let reader_handle = tokio::spawn(async move {
        loop {
            let frame = read_frame(&mut reader).await;
            let failed = frame.is_err();
            if frame_tx.send(frame).await.is_err() || failed {
                break;
            }
        }
    });

    let idle_timeout = state.options.idle_timeout;
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);
    let mut events: Option<broadcast::Receiver<BookingEvent>> = None;

    loop {
        tokio::select! {
            frame = frame_rx.recv() => {
                match frame {
                    Some(Ok(msg)) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        let flow =
                            handle_message(msg, session_id, admin, &state, &msg_tx, &mut events)
                                .await;
                        if flow.is_break() {
                            break;
                        }
                    }
                    Some(Err(Error::ConnectionClosed)) | None => {
                        debug!(session_id = %session_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "Read error");
                        break;
                    }
                }
            }

            event = next_event(&mut events) => {
                match event {
                    Ok(event) => {
                        // A listening subscriber is not idle
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        let _ = msg_tx.send(Message::Event(event)).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(session_id = %session_id, missed, "Subscriber lagged");
                        let _ = msg_tx.send(Message::Lagged { missed }).await;
                    }
                    Err(RecvError::Closed) => {
                        events = None;
                    }
                }
            }

            _ = &mut idle => {
                info!(session_id = %session_id, "Closing idle session");
                break;
            }

            _ = shutdown_rx.recv() => {
                let _ = msg_tx.send(Message::ServerShutdown).await;
                break;
            }
        }
    }

    // Cleanup
    reader_handle.abort();
    drop(msg_tx);
    let _ = writer_handle.await;
    if let Some(session) = state.sessions.write().await.remove(&session_id) {
        info!(
            session_id = %session_id,
            client = %session.client,
            addr = %session.addr,
            admin = session.admin,
            "Session closed"
        );
    }
}

/// Wait for `Hello` and register the session
async fn handshake(
    reader: &mut ReadHalf<TcpStream>,
    addr: SocketAddr,
    state: &Arc<ServerState>,
) -> Result<(Uuid, bool)> {
    let msg = tokio::time::timeout(state.options.handshake_timeout, read_frame(reader))
        .await
        .map_err(|_| Error::Timeout)??;

    match msg {
        Message::Hello {
            client,
            admin_token,
        } => {
            let admin = match admin_token {
                Some(token) if token == state.options.admin_token => true,
                Some(_) => return Err(Error::Rejected("Invalid admin token".into())),
                None => false,
            };

            let mut sessions = state.sessions.write().await;
            if sessions.len() >= state.options.max_sessions {
                return Err(Error::Rejected("Server full".into()));
            }

            let session_id = Uuid::new_v4();
            debug!(client = %client, "Registering session");
            sessions.insert(
                session_id,
                Session {
                    client,
                    admin,
                    addr,
                },
            );
            Ok((session_id, admin))
        }
        _ => Err(Error::Rejected("Expected Hello".into())),
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<BookingEvent>>,
) -> std::result::Result<BookingEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Handle an incoming message
async fn handle_message(
    msg: Message,
    session_id: Uuid,
    admin: bool,
    state: &Arc<ServerState>,
    msg_tx: &mpsc::Sender<Message>,
    events: &mut Option<broadcast::Receiver<BookingEvent>>,
) -> ControlFlow<()> {
    let reply = match msg {
        Message::Request { id, body } => {
            let body = run_request(state, body, admin).await;
            Message::Response { id, body }
        }
        Message::Subscribe if admin => {
            *events = Some(state.events.subscribe());
            debug!(session_id = %session_id, "Subscribed to booking events");
            Message::Subscribed
        }
        Message::Subscribe => Message::Rejected {
            reason: "Subscriptions require an admin session".into(),
        },
        Message::Ping => Message::Pong,
        _ => {
            debug!(session_id = %session_id, "Ignoring unexpected message type");
            return ControlFlow::Continue(());
        }
    };

    if msg_tx.send(reply).await.is_err() {
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}

/// Run one request against the desk on a blocking thread
async fn run_request(state: &Arc<ServerState>, body: Request, admin: bool) -> Reply {
    let op = body.name();
    let state = state.clone();
    let now = Local::now().naive_local();

    let result = tokio::task::spawn_blocking(move || {
        let desk = state.lock_desk();
        let outcome = dispatch::execute(&desk, body, admin, now);
        // Published under the lock so subscribers see changes in commit order
        for event in outcome.events {
            let _ = state.events.send(event);
        }
        outcome.reply
    })
    .await;

    match result {
        Ok(reply) => reply,
        Err(e) => {
            error!(op, error = %e, "Request task failed");
            internal_error()
        }
    }
}

fn internal_error() -> Reply {
    Reply::Error {
        code: ErrorCode::Internal,
        message: "Internal error".into(),
    }
}
