//! Public client handle.
//!
//! # Architecture
//!
//! ```text
//! Client (Clone)                         Engine task (single owner)
//! ┌──────────────────┐   Command     ┌──────────────────────────────┐
//! │ connect()        │──────────────►│ select! {                    │
//! │ set_presence()   │  unbounded    │   commands.recv()            │
//! │ reply()          │  mpsc         │   read tick     (1 s)        │
//! │ shutdown()       │               │   presence tick (15 s)       │
//! │ state() ◄────────┼── watch ──────│ }                            │
//! └──────────────────┘               │ Transport + FrameDecoder     │
//!                                    │ pending presence slot        │
//!                                    │ Observers ──► callbacks      │
//!                                    └──────────────────────────────┘
//! ```
//!
//! All transport I/O, both timers and the pending presence slot live on the
//! engine task, so no locking is needed anywhere. Dropping the last
//! [`Client`] handle stops the engine and closes the connection, unless a
//! callback kept a clone of the `&Client` it was given (see [`Client`]).

mod engine;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};

use crate::config::Config;
use crate::constants::{DEFAULT_PRESENCE_INTERVAL, DEFAULT_READ_INTERVAL};
use crate::error::ClientError;
use crate::event::{Event, EventKind};
use crate::ipc::transport::{Connector, LocalConnector};
use crate::join::{JoinReply, JoinRequest};
use crate::observer::{EventHandler, Observers};
use crate::presence::RichPresence;
use crate::register::{DesktopRegistrar, Registrar};

use engine::{Engine, Settings};

/// Lifecycle of the connection to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection; `connect()` starts a sweep.
    #[default]
    Disconnected,
    /// Sweeping candidate addresses.
    Connecting,
    /// Handshake sent, subscriptions sent, Read Loop running.
    Ready,
    /// The connection ended (peer Close, transport failure or shutdown).
    Closed,
}

/// Requests from handles to the engine task.
#[derive(Debug)]
pub(crate) enum Command {
    Connect(oneshot::Sender<Result<(), ClientError>>),
    SetPresence(RichPresence),
    Reply { user_id: String, reply: JoinReply },
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a presence client.
///
/// Cheap to clone. All methods are safe to call from any thread and from
/// inside event callbacks.
///
/// The engine stops once every handle is dropped. Callbacks are owned by the
/// engine, so a callback that stores a clone of the `&Client` it receives
/// keeps the engine alive for as long as the callback exists; call
/// [`Client::shutdown`] to close the connection in that case.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    app_id: Arc<str>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("app_id", &self.app_id)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Start configuring a client for `app_id`.
    pub fn builder(app_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(app_id)
    }

    /// Application id sent in the handshake.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Sweep the candidate addresses and connect to the first that accepts.
    ///
    /// On success the handshake and the three subscriptions have been
    /// written and the Read Loop is running. There is no retry: after
    /// [`ClientError::PeerNotFound`] the caller decides when to try again.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Connect(tx))?;
        rx.await.map_err(|_closed| ClientError::EngineStopped)?
    }

    /// Replace the pending presence. The next scheduler tick sends it;
    /// values replaced before that tick are never sent.
    pub fn set_presence(&self, presence: RichPresence) {
        if self.send(Command::SetPresence(presence)).is_err() {
            log::warn!("[Presence] Engine stopped, presence update dropped");
        }
    }

    /// Answer a join request. Sends exactly one frame per call.
    pub fn reply(&self, request: &JoinRequest, reply: JoinReply) {
        let command = Command::Reply {
            user_id: request.user_id().to_owned(),
            reply,
        };
        if self.send(command).is_err() {
            log::warn!("[Engine] Engine stopped, join reply dropped");
        }
    }

    /// Stop both timers and close the transport. Idempotent; does not fire
    /// a disconnect notification.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(Command::Shutdown(tx)).is_ok() {
            // Err only if the engine already stopped, which is the goal anyway
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_closed| ClientError::EngineStopped)
    }
}

#[cfg(test)]
impl Client {
    /// Handle with no engine behind it.
    pub(crate) fn detached(app_id: &str) -> Self {
        let (commands, _) = mpsc::unbounded_channel();
        let (_, state) = watch::channel(ConnectionState::Disconnected);
        Self {
            commands,
            state,
            app_id: app_id.into(),
        }
    }
}

/// Configures and starts a [`Client`].
pub struct ClientBuilder {
    app_id: String,
    pid: u32,
    read_interval: Duration,
    presence_interval: Duration,
    auto_register: bool,
    platform_game_id: Option<String>,
    registrar: Option<Box<dyn Registrar>>,
    connector: Box<dyn Connector>,
    observers: Observers,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("app_id", &self.app_id)
            .field("pid", &self.pid)
            .field("read_interval", &self.read_interval)
            .field("presence_interval", &self.presence_interval)
            .field("auto_register", &self.auto_register)
            .field("platform_game_id", &self.platform_game_id)
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Builder with default timings, the platform connector and the desktop
    /// registrar.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            pid: std::process::id(),
            read_interval: DEFAULT_READ_INTERVAL,
            presence_interval: DEFAULT_PRESENCE_INTERVAL,
            auto_register: true,
            platform_game_id: None,
            registrar: None,
            connector: Box::new(LocalConnector),
            observers: Observers::default(),
        }
    }

    /// Builder seeded from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new(config.app_id.clone())
            .read_interval(config.read_interval())
            .presence_interval(config.presence_interval())
            .auto_register(config.auto_register);
        builder.platform_game_id.clone_from(&config.platform_game_id);
        builder
    }

    /// Read Loop period (default 1 s).
    pub fn read_interval(mut self, interval: Duration) -> Self {
        self.read_interval = interval;
        self
    }

    /// Presence Scheduler period (default 15 s).
    pub fn presence_interval(mut self, interval: Duration) -> Self {
        self.presence_interval = interval;
        self
    }

    /// Process id reported with activity updates (default: this process).
    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    /// Steam game id used for launch registration.
    pub fn platform_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.platform_game_id = Some(game_id.into());
        self
    }

    /// Whether `build()` runs the registrar (default true).
    pub fn auto_register(mut self, enabled: bool) -> Self {
        self.auto_register = enabled;
        self
    }

    /// Replace the desktop registrar.
    pub fn registrar(mut self, registrar: impl Registrar + 'static) -> Self {
        self.registrar = Some(Box::new(registrar));
        self
    }

    /// Replace the platform connector.
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Box::new(connector);
        self
    }

    /// Observe every event. Global observers run before per-kind callbacks.
    pub fn observe(mut self, handler: impl EventHandler + 'static) -> Self {
        self.observers.observe(handler);
        self
    }

    /// Called when the peer reports the connection ready.
    pub fn on_ready<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client) + Send + 'static,
    {
        self.observers
            .on(EventKind::Ready, move |client: &Client, _: &Event| {
                callback(client);
            });
        self
    }

    /// Called with `(code, message)` for peer-reported errors.
    pub fn on_error<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client, i64, &str) + Send + 'static,
    {
        self.observers
            .on(EventKind::Error, move |client: &Client, event: &Event| {
                if let Event::Error { code, message } = event {
                    callback(client, *code, message);
                }
            });
        self
    }

    /// Called with the join secret when the user joins a game.
    pub fn on_join<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client, &str) + Send + 'static,
    {
        self.observers
            .on(EventKind::Join, move |client: &Client, event: &Event| {
                if let Event::Join { secret } = event {
                    callback(client, secret);
                }
            });
        self
    }

    /// Called with the spectate secret when the user starts spectating.
    pub fn on_spectate<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client, &str) + Send + 'static,
    {
        self.observers
            .on(EventKind::Spectate, move |client: &Client, event: &Event| {
                if let Event::Spectate { secret } = event {
                    callback(client, secret);
                }
            });
        self
    }

    /// Called when another user asks to join; answer with [`Client::reply`].
    pub fn on_join_request<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client, &JoinRequest, &str) + Send + 'static,
    {
        self.observers
            .on(EventKind::JoinRequest, move |client: &Client, event: &Event| {
                if let Event::JoinRequest { request, secret } = event {
                    callback(client, request, secret);
                }
            });
        self
    }

    /// Called once when the connection ends, with the Close code and
    /// message when the peer sent them.
    pub fn on_disconnect<F>(mut self, mut callback: F) -> Self
    where
        F: FnMut(&Client, Option<i64>, Option<&str>) + Send + 'static,
    {
        self.observers
            .on(EventKind::Disconnected, move |client: &Client, event: &Event| {
                if let Event::Disconnected { code, message } = event {
                    callback(client, *code, message.as_deref());
                }
            });
        self
    }

    /// Run registration and spawn the engine.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Client {
        let Self {
            app_id,
            pid,
            read_interval,
            presence_interval,
            auto_register,
            platform_game_id,
            registrar,
            connector,
            observers,
        } = self;

        if auto_register {
            let registrar = registrar.unwrap_or_else(|| Box::new(DesktopRegistrar::new()));
            registrar.register(&app_id, platform_game_id.as_deref());
        }

        if observers.is_empty() {
            log::debug!("[Engine] No observers registered for {app_id}");
        }

        let app_id: Arc<str> = app_id.into();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let client = Client {
            commands: commands_tx,
            state: state_rx,
            app_id: Arc::clone(&app_id),
        };

        let settings = Settings {
            app_id,
            pid,
            read_interval,
            presence_interval,
        };
        let engine = Engine::new(settings, connector, observers, state_tx, &client);
        tokio::spawn(engine.run(commands_rx));

        client
    }
}
