//! Server application: wiring and lifecycle.
//!
//! [`App`] owns the long-lived pieces — camera facade, frame
//! collector, handler registry, and the session map — and runs the
//! accept loop. Sessions hold a weak backlink to [`AppShared`], so
//! ownership flows strictly downward: the app owns sessions, sessions
//! and listener tasks borrow the app.

use crate::acceptor::Acceptor;
use crate::collector::FrameCollector;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::handlers::MessageRouter;
use crate::session::ClientSession;
use framecast_camera::Camera;
use framecast_core::ClientId;
use framecast_protocol::{OutMessage, Serializer};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// State shared between the accept loop, sessions, handlers, and
/// listener tasks.
#[derive(Debug)]
pub struct AppShared {
    config: ServerConfig,
    camera: Camera,
    collector: FrameCollector,
    router: MessageRouter,
    sessions: StdMutex<HashMap<ClientId, Arc<ClientSession>>>,
}

impl AppShared {
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn collector(&self) -> &FrameCollector {
        &self.collector
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    /// Look up a connected session.
    pub fn get_session(&self, client_id: ClientId) -> Option<Arc<ClientSession>> {
        self.sessions.lock().unwrap().get(&client_id).cloned()
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub(crate) fn insert_session(&self, session: Arc<ClientSession>) {
        self.sessions.lock().unwrap().insert(session.id(), session);
    }

    /// Drop a session from the map; called by the session itself when
    /// its read loop ends.
    pub fn remove_session(&self, client_id: ClientId) {
        let removed = self.sessions.lock().unwrap().remove(&client_id);
        if removed.is_some() {
            debug!(client = %client_id.short(), "session removed from map");
        }
    }

    /// Serialize `message` once and send it to every connected
    /// session, each under its own writer lock, skipping `except`.
    pub async fn broadcast(&self, message: OutMessage, except: Option<ClientId>) {
        let serialized = match Serializer::serialize(message) {
            Ok(serialized) => serialized,
            Err(err) => {
                error!(error = %err, "broadcast serialization failed");
                return;
            }
        };

        let targets: Vec<Arc<ClientSession>> = {
            let sessions = self.sessions.lock().unwrap();
            sessions
                .values()
                .filter(|session| Some(session.id()) != except)
                .cloned()
                .collect()
        };

        debug!(targets = targets.len(), "broadcasting message");
        for session in targets {
            if let Err(err) = session.send_serialized(&serialized).await {
                warn!(client = %session.id().short(), error = %err, "broadcast delivery failed");
            }
        }
    }
}

/// The running server.
///
/// # Example
///
/// ```no_run
/// use framecast_server::{App, ServerConfig};
///
/// # async fn example() -> framecast_server::Result<()> {
/// let app = App::start(ServerConfig::default()).await?;
/// println!("listening on {}", app.local_addr());
/// // ... serve until shutdown ...
/// app.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct App {
    shared: Arc<AppShared>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl App {
    /// Start a server over a fresh virtual camera.
    ///
    /// # Errors
    /// Fails when the bind address is unavailable or the camera
    /// cannot be initialized.
    pub async fn start(config: ServerConfig) -> Result<App> {
        Self::start_with_camera(config, Camera::virtual_camera()).await
    }

    /// Start a server over an existing camera facade.
    ///
    /// # Errors
    /// Fails when the bind address is unavailable or the camera
    /// cannot be initialized.
    pub async fn start_with_camera(config: ServerConfig, camera: Camera) -> Result<App> {
        info!("starting frame server");
        camera.reset_roi().await?;

        let collector = FrameCollector::new(camera.clone());
        collector.start();

        let router = MessageRouter::with_standard_handlers()?;

        let acceptor = Acceptor::bind(config.bind_addr).await?;
        let local_addr = acceptor.local_addr()?;

        let shared = Arc::new(AppShared {
            config,
            camera,
            collector,
            router,
            sessions: StdMutex::new(HashMap::new()),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                acceptor.run(shared, shutdown_rx).await;
            })
        };

        info!(%local_addr, "frame server started");
        Ok(App {
            shared,
            local_addr,
            shutdown_tx,
            accept_task,
        })
    }

    /// The bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state handle, for embedding and tests.
    pub fn shared(&self) -> Arc<AppShared> {
        Arc::clone(&self.shared)
    }

    /// The camera behind this server.
    pub fn camera(&self) -> Camera {
        self.shared.camera.clone()
    }

    /// Stop accepting, stop the frame scheduler, and shut every
    /// session's socket down. Session read loops exit as their peers
    /// observe the close.
    pub async fn stop(self) {
        info!("stopping frame server");
        let _ = self.shutdown_tx.send(true);
        let _ = self.accept_task.await;

        self.shared.collector.stop().await;

        let sessions: Vec<Arc<ClientSession>> = {
            let mut map = self.shared.sessions.lock().unwrap();
            map.drain().map(|(_, session)| session).collect()
        };
        for session in sessions {
            session.shutdown_socket().await;
        }
        info!("frame server stopped");
    }
}
