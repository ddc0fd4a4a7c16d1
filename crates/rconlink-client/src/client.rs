use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rconlink_frame::{Frame, PacketType, RconCodec};
use rconlink_transport::{connect_with_timeout, Endpoint};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::auth::authenticate;
use crate::config::{ClientOptions, RconConfig};
use crate::error::{ClientError, Result};
use crate::response::CommandResult;
use crate::retry::RetryPolicy;
use crate::sender::CommandSender;

type FrameSink = SplitSink<Framed<TcpStream, RconCodec>, Frame>;
type FrameStream = SplitStream<Framed<TcpStream, RconCodec>>;
type Reply = std::result::Result<Frame, String>;

/// Lifecycle of the client's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waiters for in-flight commands on one connection, keyed by request id.
#[derive(Default)]
struct Pending {
    inner: StdMutex<PendingInner>,
}

#[derive(Default)]
struct PendingInner {
    waiters: HashMap<i32, oneshot::Sender<Reply>>,
    closed: Option<String>,
}

impl Pending {
    fn register(&self, request_id: i32) -> std::result::Result<oneshot::Receiver<Reply>, String> {
        let mut inner = lock(&self.inner);
        if let Some(reason) = &inner.closed {
            return Err(reason.clone());
        }
        let (tx, rx) = oneshot::channel();
        inner.waiters.insert(request_id, tx);
        Ok(rx)
    }

    fn remove(&self, request_id: i32) -> bool {
        lock(&self.inner).waiters.remove(&request_id).is_some()
    }

    /// Hand `frame` to its waiter. Returns false when nobody is waiting.
    fn complete(&self, frame: Frame) -> bool {
        let waiter = lock(&self.inner).waiters.remove(&frame.request_id);
        match waiter {
            Some(tx) => tx.send(Ok(frame)).is_ok(),
            None => false,
        }
    }

    /// Fail every waiter and refuse new registrations.
    fn close(&self, reason: &str) {
        let waiters = {
            let mut inner = lock(&self.inner);
            if inner.closed.is_none() {
                inner.closed = Some(reason.to_string());
            }
            std::mem::take(&mut inner.waiters)
        };
        for (_, tx) in waiters {
            let _ = tx.send(Err(reason.to_string()));
        }
    }

    fn is_closed(&self) -> bool {
        lock(&self.inner).closed.is_some()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        lock(&self.inner).waiters.len()
    }
}

/// State shared with the reader task.
struct Shared {
    state: StdMutex<ConnectionState>,
    generation: AtomicU64,
}

impl Shared {
    /// Start a new connection generation in `Connecting`.
    fn begin_connect(&self) -> u64 {
        let mut state = lock(&self.state);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *state = ConnectionState::Connecting;
        generation
    }

    /// Move to `next` only if no newer connection attempt has started.
    fn transition(&self, generation: u64, next: ConnectionState) {
        let mut state = lock(&self.state);
        if self.generation.load(Ordering::SeqCst) == generation {
            *state = next;
        }
    }

    fn set(&self, next: ConnectionState) {
        *lock(&self.state) = next;
    }

    fn get(&self) -> ConnectionState {
        *lock(&self.state)
    }
}

struct Connection {
    sink: FrameSink,
    pending: Arc<Pending>,
    reader: JoinHandle<()>,
}

impl Connection {
    fn is_alive(&self) -> bool {
        !self.pending.is_closed()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Client for one remote-console server.
///
/// Commands may be issued concurrently from several tasks: writes are
/// serialized, and a background reader routes each reply to the command
/// whose request id it carries. A reply that arrives after its command
/// timed out is dropped instead of being handed to the next command.
pub struct RconClient {
    config: RconConfig,
    options: ClientOptions,
    endpoint: Endpoint,
    next_id: AtomicI32,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
}

impl fmt::Debug for RconClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RconClient")
            .field("config", &self.config)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}

impl RconClient {
    /// Create a client with default [`ClientOptions`]. Does not connect.
    pub fn new(config: RconConfig) -> Result<Self> {
        Self::with_options(config, ClientOptions::default())
    }

    pub fn with_options(config: RconConfig, options: ClientOptions) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint();
        Ok(Self {
            config,
            options,
            endpoint,
            next_id: AtomicI32::new(1),
            shared: Arc::new(Shared {
                state: StdMutex::new(ConnectionState::Disconnected),
                generation: AtomicU64::new(0),
            }),
            connection: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RconConfig {
        &self.config
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Connect and authenticate, retrying per [`ClientOptions::retry`].
    ///
    /// Does nothing when already connected.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if guard.as_ref().is_some_and(Connection::is_alive) {
            return Ok(());
        }
        self.establish(&mut guard, self.options.retry).await
    }

    /// Close the connection and fail any in-flight commands. Idempotent.
    pub async fn disconnect(&self) {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.take() {
            connection.pending.close("client disconnected");
            info!(endpoint = %self.endpoint, "disconnected");
        }
        self.shared.set(ConnectionState::Disconnected);
    }

    /// Send a command using [`ClientOptions::command_timeout`].
    pub async fn send(&self, command: &str) -> CommandResult {
        self.send_command(command, self.options.command_timeout)
            .await
    }

    /// Send a command and wait up to `timeout` for its reply.
    ///
    /// Never fails: connection problems, timeouts and lost connections are
    /// reported through [`CommandResult::error`].
    pub async fn send_command(&self, command: &str, timeout: Duration) -> CommandResult {
        match self.execute(command, timeout).await {
            Ok(frame) => CommandResult::ok(frame.text()),
            Err(err) => {
                debug!(command, error = %err, "command failed");
                CommandResult::failure(err.to_string())
            }
        }
    }

    /// Send a command and return the raw reply frame.
    ///
    /// When not connected, one reconnect attempt is made first.
    pub async fn execute(&self, command: &str, timeout: Duration) -> Result<Frame> {
        let (request_id, pending, reply, started) = {
            let mut guard = self.connection.lock().await;
            if !guard.as_ref().is_some_and(Connection::is_alive) {
                self.establish(&mut guard, RetryPolicy::once())
                    .await
                    .map_err(|err| ClientError::NotConnected(err.to_string()))?;
            }
            let Some(connection) = guard.as_mut() else {
                return Err(ClientError::NotConnected(
                    "connection unavailable".to_string(),
                ));
            };

            let started = Instant::now();
            let request_id = self.next_request_id();
            let reply = connection
                .pending
                .register(request_id)
                .map_err(ClientError::Disconnected)?;
            let frame = Frame::new(request_id, PacketType::Command, command.as_bytes().to_vec());

            let write_error = match tokio::time::timeout(timeout, connection.sink.send(frame)).await
            {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(ClientError::Disconnected(err.to_string())),
                Err(_) => Some(ClientError::Timeout(timeout)),
            };
            if let Some(err) = write_error {
                // A half-written frame leaves the stream unusable.
                connection.pending.remove(request_id);
                if let Some(connection) = guard.take() {
                    connection.pending.close(&err.to_string());
                }
                self.shared.set(ConnectionState::Disconnected);
                warn!(request_id, error = %err, "command write failed");
                return Err(err);
            }
            (request_id, Arc::clone(&connection.pending), reply, started)
        };
        debug!(request_id, command, "command sent");

        let remaining = timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, reply).await {
            Ok(Ok(Ok(frame))) => {
                debug!(
                    request_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    size = frame.payload.len(),
                    "reply received"
                );
                Ok(frame)
            }
            Ok(Ok(Err(reason))) => Err(ClientError::Disconnected(reason)),
            Ok(Err(_)) => Err(ClientError::Disconnected(
                "reply channel closed".to_string(),
            )),
            Err(_) => {
                pending.remove(request_id);
                warn!(
                    request_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "command timed out"
                );
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    /// Replace whatever connection `slot` holds with a fresh one.
    async fn establish(&self, slot: &mut Option<Connection>, policy: RetryPolicy) -> Result<()> {
        if let Some(stale) = slot.take() {
            stale.pending.close("reconnecting");
        }
        let connection = policy
            .run(&self.endpoint, |attempt| self.connect_once(attempt))
            .await?;
        *slot = Some(connection);
        Ok(())
    }

    async fn connect_once(&self, attempt: u32) -> Result<Connection> {
        let generation = self.shared.begin_connect();
        debug!(endpoint = %self.endpoint, attempt, "connecting");
        match self.open(generation).await {
            Ok(connection) => {
                self.shared
                    .transition(generation, ConnectionState::Ready);
                info!(endpoint = %self.endpoint, attempt, "connected");
                Ok(connection)
            }
            Err(err) => {
                self.shared
                    .transition(generation, ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    async fn open(&self, generation: u64) -> Result<Connection> {
        let stream = connect_with_timeout(&self.endpoint, self.options.connect_timeout).await?;
        let mut framed = Framed::new(stream, RconCodec::new(self.options.max_payload_size));

        self.shared
            .transition(generation, ConnectionState::Authenticating);
        authenticate(
            &mut framed,
            self.next_request_id(),
            &self.config.password,
            self.options.connect_timeout,
        )
        .await?;

        let (sink, stream) = framed.split();
        let pending = Arc::new(Pending::default());
        let reader = tokio::spawn(read_loop(
            stream,
            Arc::clone(&pending),
            Arc::clone(&self.shared),
            generation,
        ));
        Ok(Connection {
            sink,
            pending,
            reader,
        })
    }

    /// Next request id: positive, increasing, wrapping back to 1.
    fn next_request_id(&self) -> i32 {
        let previous = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| {
                Some(if id >= i32::MAX { 1 } else { id + 1 })
            });
        match previous {
            Ok(id) | Err(id) => id,
        }
    }
}

impl CommandSender for RconClient {
    fn send_command(
        &self,
        command: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = CommandResult> + Send {
        RconClient::send_command(self, command, timeout)
    }
}

async fn read_loop(
    mut stream: FrameStream,
    pending: Arc<Pending>,
    shared: Arc<Shared>,
    generation: u64,
) {
    let reason = loop {
        match stream.next().await {
            Some(Ok(frame)) => {
                let request_id = frame.request_id;
                if !pending.complete(frame) {
                    debug!(request_id, "discarding reply with no waiting command");
                }
            }
            Some(Err(err)) => break err.to_string(),
            None => break "server closed the connection".to_string(),
        }
    };
    warn!(reason = %reason, "connection lost");
    pending.close(&reason);
    shared.transition(generation, ConnectionState::Disconnected);
}
