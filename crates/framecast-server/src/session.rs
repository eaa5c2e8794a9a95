//! Per-client session: command channel plus frame delivery.
//!
//! Each accepted connection gets one [`ClientSession`]. The session's
//! read loop decodes newline-terminated control lines, parses them,
//! and dispatches through the app's handler registry; replies go out
//! under the session's writer lock.
//!
//! Frame delivery runs on a separate detached listener task, started
//! only by the capture commands. It drains the client's frame queue
//! and interleaves with command replies through the same writer lock,
//! so a multi-megabyte frame and a one-line reply never corrupt each
//! other on the wire. Within one message the header is fully written
//! before any payload byte.

use crate::app::AppShared;
use crate::collector::ClientQueue;
use crate::error::{Result, ServerError};
use chrono::{DateTime, Utc};
use framecast_core::ClientId;
use framecast_core::constants::{DEFAULT_FRAME_RATE, DEFAULT_SEQUENCE_LENGTH};
use framecast_protocol::{
    Command, ErrorMessage, InMessageKind, LineDecoder, OutMessage, Parser, SerializedMessage,
    Serializer, Success,
};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace, warn};

/// Per-session streaming parameters, set through `fr` and `isl` and
/// consumed by the `gis` command.
#[derive(Debug, Clone)]
pub struct StreamParams {
    /// Requested stream frame rate in fps.
    pub frame_rate: f64,
    /// Frames per stream.
    pub sequence_length: u64,
    /// Index of the next frame in the active stream.
    pub sequence_number: u64,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            sequence_number: 0,
        }
    }
}

/// Listener task state: at most one per session.
#[derive(Debug, Default)]
struct ListeningState {
    running: bool,
    stop: Option<Arc<AtomicBool>>,
}

/// One connected client.
pub struct ClientSession {
    id: ClientId,
    peer_addr: SocketAddr,
    connected_at: DateTime<Utc>,
    /// Writer lock: command replies and frame deliveries are mutually
    /// exclusive on the wire.
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    params: StdMutex<StreamParams>,
    listening: StdMutex<ListeningState>,
    /// Non-owning backlink; the app owns the session, not vice versa.
    app: Weak<AppShared>,
}

impl ClientSession {
    /// Wrap an accepted stream. Returns the shared session and the
    /// read half the caller feeds into [`run`](Self::run).
    pub fn new(
        id: ClientId,
        stream: TcpStream,
        app: Weak<AppShared>,
    ) -> std::io::Result<(Arc<Self>, OwnedReadHalf)> {
        let peer_addr = stream.peer_addr()?;
        if let Err(error) = stream.set_nodelay(true) {
            warn!(client = %id.short(), %error, "failed to set TCP_NODELAY");
        }
        let (read_half, write_half) = stream.into_split();
        let session = Arc::new(ClientSession {
            id,
            peer_addr,
            connected_at: Utc::now(),
            writer: tokio::sync::Mutex::new(write_half),
            params: StdMutex::new(StreamParams::default()),
            listening: StdMutex::new(ListeningState::default()),
            app,
        });
        Ok((session, read_half))
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Snapshot of the streaming parameters.
    pub fn stream_params(&self) -> StreamParams {
        self.params.lock().unwrap().clone()
    }

    /// Mutate the streaming parameters.
    pub fn update_stream_params(&self, f: impl FnOnce(&mut StreamParams)) {
        f(&mut self.params.lock().unwrap());
    }

    /// Returns `true` while a listener task is active.
    pub fn is_listening(&self) -> bool {
        self.listening.lock().unwrap().running
    }

    /// Claim the listener slot and hand back its stop flag.
    ///
    /// # Errors
    /// Returns `ServerError::AlreadyListening` if a listener runs.
    fn begin_listening(&self) -> Result<Arc<AtomicBool>> {
        let mut listening = self.listening.lock().unwrap();
        if listening.running {
            return Err(ServerError::AlreadyListening(self.id));
        }
        let stop = Arc::new(AtomicBool::new(false));
        listening.running = true;
        listening.stop = Some(Arc::clone(&stop));
        Ok(stop)
    }

    fn end_listening(&self) {
        let mut listening = self.listening.lock().unwrap();
        listening.running = false;
        listening.stop = None;
    }

    /// Signal the active listener to stop. Returns `false` when no
    /// listener is running.
    pub fn request_listener_stop(&self) -> bool {
        let listening = self.listening.lock().unwrap();
        match (&listening.stop, listening.running) {
            (Some(stop), true) => {
                stop.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Serialize and send one message under the writer lock.
    pub async fn send_message(&self, message: OutMessage) -> Result<()> {
        let serialized = Serializer::serialize(message)?;
        self.send_serialized(&serialized).await
    }

    /// Serialize and send a batch under one writer lock acquisition,
    /// so the batch reaches the wire contiguously.
    pub async fn send_messages(&self, messages: Vec<OutMessage>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut serialized = Vec::with_capacity(messages.len());
        for message in messages {
            serialized.push(Serializer::serialize(message)?);
        }
        let mut writer = self.writer.lock().await;
        for message in &serialized {
            Self::write_serialized(&mut writer, message).await?;
        }
        Ok(())
    }

    /// Send an already-serialized message (the broadcast path).
    pub async fn send_serialized(&self, message: &SerializedMessage) -> Result<()> {
        let mut writer = self.writer.lock().await;
        Self::write_serialized(&mut writer, message).await
    }

    async fn write_serialized(
        writer: &mut OwnedWriteHalf,
        message: &SerializedMessage,
    ) -> Result<()> {
        // Header strictly before payload; the payload is raw bytes,
        // delimited by the header-encoded shape and the ETX byte.
        writer.write_all(message.header.as_bytes()).await?;
        if message.has_payload() {
            writer.write_all(&message.payload).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Read loop. Returns when the peer disconnects, an I/O error
    /// occurs, or the app shuts the session down; tears the session
    /// state down on the way out.
    pub async fn run(self: &Arc<Self>, read_half: OwnedReadHalf) {
        info!(client = %self.id.short(), peer = %self.peer_addr, "session started");
        let read_timeout = self
            .app
            .upgrade()
            .and_then(|app| app.config().read_timeout);
        let mut lines = FramedRead::new(read_half, LineDecoder::new());

        loop {
            let next = match read_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, lines.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!(client = %self.id.short(), "read timeout, still waiting");
                        continue;
                    }
                },
                None => lines.next().await,
            };

            match next {
                Some(Ok(line)) => self.process_line(&line).await,
                Some(Err(error)) => {
                    error!(client = %self.id.short(), %error, "read error");
                    break;
                }
                None => {
                    info!(client = %self.id.short(), "connection closed by client");
                    break;
                }
            }
        }

        self.teardown().await;
        info!(client = %self.id.short(), "session terminated");
    }

    async fn process_line(&self, line: &str) {
        trace!(client = %self.id.short(), line, "processing line");
        let Some(app) = self.app.upgrade() else {
            return;
        };

        let Some(message) = Parser::parse(line) else {
            // Reply only when an identifier is extractable; otherwise
            // the line is logged and dropped.
            if let Some(identifier) = Parser::extract_identifier(line) {
                let reply = ErrorMessage::new(
                    identifier,
                    InMessageKind::Command,
                    "unable to parse message",
                );
                if let Err(error) = self.send_message(reply.into()).await {
                    warn!(client = %self.id.short(), %error, "failed to send parse error");
                }
            } else {
                warn!(client = %self.id.short(), line, "dropping unparseable line");
            }
            return;
        };

        let replies = app.router().handle(&app, self.id, message).await;
        if let Err(error) = self.send_messages(replies).await {
            error!(client = %self.id.short(), %error, "failed to send replies");
        }
    }

    /// Start the detached frame listener task for `command` (`gi` or
    /// `gis`), draining `queue` onto the socket.
    ///
    /// # Errors
    /// Returns `ServerError::AlreadyListening` if a listener is active.
    pub fn start_listener(self: &Arc<Self>, queue: ClientQueue, command: Command) -> Result<()> {
        let stop = self.begin_listening()?;
        // The task holds a weak reference so a torn-down session can
        // be collected while frames are still in flight; the queue's
        // done flag is the liveness signal that ends the loop.
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            listener_loop(session, queue, command, stop).await;
        });
        Ok(())
    }

    /// Shut the write side of the socket down, signalling the peer to
    /// close. The read loop then ends on the resulting EOF or error.
    pub async fn shutdown_socket(&self) {
        self.request_listener_stop();
        let mut writer = self.writer.lock().await;
        if let Err(error) = writer.shutdown().await {
            debug!(client = %self.id.short(), %error, "socket shutdown failed");
        }
    }

    /// Drop this client from the frame scheduler, closing its queue.
    fn deregister_from_collector(&self) {
        if let Some(app) = self.app.upgrade() {
            app.collector().deregister_client(self.id);
        }
    }

    async fn teardown(self: &Arc<Self>) {
        self.request_listener_stop();
        // Deregistration closes the frame queue, which wakes a
        // listener parked in pop.
        self.deregister_from_collector();
        if let Some(app) = self.app.upgrade() {
            app.remove_session(self.id);
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

/// Frame listener: pops frames and writes `img` blocks followed by an
/// `isn` status line, until the stream completes or is stopped.
///
/// On natural completion (the producer finished the stream) a final
/// command `Success` is emitted. On a stop request the task exits
/// silently; the client asked the stream to die and gets no completion
/// message.
async fn listener_loop(
    session: Weak<ClientSession>,
    queue: ClientQueue,
    command: Command,
    stop: Arc<AtomicBool>,
) {
    {
        let Some(session) = session.upgrade() else {
            return;
        };
        session.update_stream_params(|params| params.sequence_number = 0);
        debug!(client = %session.id().short(), command = %command.identifier, "frame listener started");
    }

    loop {
        let frame = queue.pop().await;
        let Some(session) = session.upgrade() else {
            return;
        };

        if stop.load(Ordering::SeqCst) {
            debug!(client = %session.id().short(), "frame listener stopped on request");
            session.end_listening();
            return;
        }

        match frame {
            Some(frame) => {
                let sequence_number = session.stream_params().sequence_number;
                trace!(
                    client = %session.id().short(),
                    sequence_number,
                    frame_id = frame.metadata.frame_id,
                    "delivering frame"
                );
                let batch = vec![
                    OutMessage::Image(frame.image),
                    Success::status("isn", sequence_number as i64).into(),
                ];
                if let Err(error) = session.send_messages(batch).await {
                    error!(client = %session.id().short(), %error, "failed to deliver frame");
                    // A dead socket must not leave the client in the
                    // scheduler, where its full queue would stall
                    // deliveries behind it.
                    session.deregister_from_collector();
                    session.end_listening();
                    return;
                }
                session.update_stream_params(|params| params.sequence_number += 1);
            }
            None => {
                // Producer finished: the stream ran to completion.
                let done = Success::from_command(command);
                if let Err(error) = session.send_message(done.into()).await {
                    warn!(client = %session.id().short(), %error, "failed to send completion");
                }
                debug!(client = %session.id().short(), "frame stream complete");
                session.end_listening();
                return;
            }
        }
    }
}
