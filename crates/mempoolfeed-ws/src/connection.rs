//! The connection task.
//!
//! One Tokio task owns the socket, the connection state and the reconnect
//! attempt counter. Callers reach it only through [`Command`]s, so
//! `connect`, `disconnect`, `subscribe` and the receive loop never run
//! concurrently against the same state. A `disconnect` is observed by the
//! `select!` in whichever phase the session is in (opening, receiving or
//! backoff), which ends the session on the spot.
//!
//! ```text
//! idle ──connect──▶ session: open → want → replay → receive loop
//!                      ▲                              │ failure
//!                      └──── backoff (cancellable) ◀──┘
//! ```

use std::sync::{Arc, Mutex};

use mempoolfeed_core::{
    decode_frame, ConnectionState, InboundEvent, ReconnectPolicy, StatusPublisher, Subscription,
    SubscriptionRegistry, TransportError,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::metrics::ClientMetrics;
use crate::stream::EventStream;
use crate::transport::{Connector, FrameSocket};

/// Command sent from the client handle to the connection task.
pub(crate) enum Command {
    Connect {
        reply: oneshot::Sender<Result<EventStream, ClientError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Subscribe(Vec<Subscription>),
}

/// Why the current socket stopped.
enum SocketExit {
    Failed(TransportError),
    Cancelled,
    Shutdown,
}

/// How a session ended.
enum SessionEnd {
    Stopped,
    Exhausted,
    Shutdown,
}

/// What a command received during a session asks for.
enum SessionCommand {
    Continue,
    /// Frames to send on the open socket, if there is one.
    Send(Vec<String>),
    Disconnect(oneshot::Sender<()>),
    Shutdown,
}

pub(crate) struct Connection {
    url: String,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    registry: SubscriptionRegistry,
    status: StatusPublisher,
    metrics: Arc<Mutex<ClientMetrics>>,
    state: ConnectionState,
    attempt: u32,
    events: Option<mpsc::UnboundedSender<InboundEvent>>,
}

impl Connection {
    pub(crate) fn new(
        url: String,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        status: StatusPublisher,
        metrics: Arc<Mutex<ClientMetrics>>,
    ) -> Self {
        let policy = ReconnectPolicy::new(config.reconnect());
        Self {
            url,
            config,
            connector,
            policy,
            registry: SubscriptionRegistry::new(),
            status,
            metrics,
            state: ConnectionState::Disconnected,
            attempt: 0,
            events: None,
        }
    }

    /// Task body. Returns when every client handle is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = commands.recv().await {
            match cmd {
                Command::Connect { reply } => {
                    let (tx, stream) = EventStream::channel();
                    self.events = Some(tx);
                    let _ = reply.send(Ok(stream));
                    match self.run_session(&mut commands).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Stopped | SessionEnd::Exhausted => {}
                    }
                }
                Command::Disconnect { reply } => {
                    self.stop();
                    let _ = reply.send(());
                }
                Command::Subscribe(entries) => {
                    self.registry.subscribe(entries);
                }
            }
        }
        self.transition(ConnectionState::Disconnected);
        debug!(url = %self.url, "connection task exiting");
    }

    /// Publish a state change. Publishing happens before anything else the
    /// caller does next, so observers never lag behind event delivery.
    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        self.state = next;
        self.status.publish(next);
        debug!(url = %self.url, state = %next, "connection state changed");
    }

    /// Explicit disconnect: end the event stream.
    fn stop(&mut self) {
        self.events = None;
        self.transition(ConnectionState::Disconnected);
        info!(url = %self.url, "disconnected");
    }

    fn with_metrics(&self, f: impl FnOnce(&mut ClientMetrics)) {
        let mut metrics = self.metrics.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut metrics);
    }

    /// Connect, and keep reconnecting until cancelled or the policy is exhausted.
    async fn run_session(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> SessionEnd {
        self.attempt = 0;

        loop {
            let error = match self.run_socket(commands).await {
                SocketExit::Failed(e) => e,
                SocketExit::Cancelled => return SessionEnd::Stopped,
                SocketExit::Shutdown => return SessionEnd::Shutdown,
            };
            self.transition(ConnectionState::Disconnected);

            let Some(delay) = self.policy.delay(self.attempt) else {
                warn!(
                    url = %self.url,
                    error = %error,
                    attempts = self.attempt,
                    "reconnect attempts exhausted; waiting for an explicit connect"
                );
                return SessionEnd::Exhausted;
            };
            warn!(
                url = %self.url,
                error = %error,
                attempt = self.attempt,
                delay_ms = delay.as_millis() as u64,
                "connection lost, reconnecting"
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    cmd = commands.recv() => match self.on_session_command(cmd) {
                        SessionCommand::Continue | SessionCommand::Send(_) => {}
                        SessionCommand::Disconnect(reply) => {
                            self.stop();
                            let _ = reply.send(());
                            return SessionEnd::Stopped;
                        }
                        SessionCommand::Shutdown => return SessionEnd::Shutdown,
                    },
                    _ = &mut sleep => break,
                }
            }

            self.attempt += 1;
            self.with_metrics(|m| m.reconnect_attempts += 1);
        }
    }

    /// Open one socket and run its receive loop until it fails or is stopped.
    async fn run_socket(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>) -> SocketExit {
        self.transition(ConnectionState::Connecting);
        info!(url = %self.url, attempt = self.attempt, "connecting to push API");

        let mut socket = match self.open(commands).await {
            Ok(socket) => socket,
            Err(exit) => return exit,
        };

        let mut frames = vec![self.config.want_message().to_frame()];
        frames.extend(self.registry.replay_frames());
        if let Err(e) = send_all(socket.as_mut(), frames).await {
            return SocketExit::Failed(e);
        }
        debug!(url = %self.url, subscriptions = self.registry.len(), "subscriptions replayed");

        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => match self.on_session_command(cmd) {
                    SessionCommand::Continue => {}
                    SessionCommand::Send(frames) => {
                        if let Err(e) = send_all(socket.as_mut(), frames).await {
                            return SocketExit::Failed(e);
                        }
                    }
                    SessionCommand::Disconnect(reply) => {
                        socket.close().await;
                        self.stop();
                        let _ = reply.send(());
                        return SocketExit::Cancelled;
                    }
                    SessionCommand::Shutdown => {
                        socket.close().await;
                        return SocketExit::Shutdown;
                    }
                },
                frame = socket.next_text() => match frame {
                    Ok(text) => self.on_frame(&text),
                    Err(e) => return SocketExit::Failed(e),
                },
            }
        }
    }

    /// Open the socket within the connect deadline, still serving commands.
    async fn open(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Result<Box<dyn FrameSocket>, SocketExit> {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let timeout = self.config.connect_timeout();
        let connect = time::timeout(timeout, connector.connect(&url));
        tokio::pin!(connect);

        loop {
            tokio::select! {
                biased;
                cmd = commands.recv() => match self.on_session_command(cmd) {
                    // Registered already; replayed once the socket is open.
                    SessionCommand::Continue | SessionCommand::Send(_) => {}
                    SessionCommand::Disconnect(reply) => {
                        self.stop();
                        let _ = reply.send(());
                        return Err(SocketExit::Cancelled);
                    }
                    SessionCommand::Shutdown => return Err(SocketExit::Shutdown),
                },
                result = &mut connect => {
                    return match result {
                        Ok(Ok(socket)) => Ok(socket),
                        Ok(Err(e)) => Err(SocketExit::Failed(e)),
                        Err(_) => Err(SocketExit::Failed(TransportError::Timeout {
                            ms: timeout.as_millis() as u64,
                        })),
                    };
                }
            }
        }
    }

    /// Handle a command that arrived while a session is running.
    fn on_session_command(&mut self, cmd: Option<Command>) -> SessionCommand {
        match cmd {
            None => SessionCommand::Shutdown,
            Some(Command::Disconnect { reply }) => SessionCommand::Disconnect(reply),
            Some(Command::Connect { reply }) => {
                let _ = reply.send(Err(ClientError::AlreadyActive));
                SessionCommand::Continue
            }
            Some(Command::Subscribe(entries)) => {
                let frames = entries
                    .iter()
                    .map(|s| s.control_message().to_frame())
                    .collect();
                self.registry.subscribe(entries);
                SessionCommand::Send(frames)
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        self.attempt = 0;
        self.transition(ConnectionState::Connected);
        self.with_metrics(|m| m.frames_received += 1);

        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.with_metrics(|m| m.decode_errors += 1);
                let preview: String = text.chars().take(120).collect();
                warn!(url = %self.url, error = %e, frame = %preview, "dropping malformed frame");
                return;
            }
        };

        let Some(events) = &self.events else { return };
        let mut forwarded = 0;
        for event in frame.forwardable() {
            if events.send(event).is_err() {
                debug!("event stream receiver dropped");
                break;
            }
            forwarded += 1;
        }
        self.with_metrics(|m| m.events_forwarded += forwarded);
    }
}

async fn send_all(socket: &mut dyn FrameSocket, frames: Vec<String>) -> Result<(), TransportError> {
    for frame in frames {
        socket.send_text(frame).await?;
    }
    Ok(())
}
