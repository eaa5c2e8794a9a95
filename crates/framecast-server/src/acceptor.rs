//! Connection acceptance.

use crate::app::AppShared;
use crate::error::{Result, ServerError};
use crate::session::ClientSession;
use framecast_core::ClientId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Backoff after a failed `accept` so a transient error (fd
/// exhaustion, interface flap) does not spin the loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Owns the listening socket and turns connections into sessions.
#[derive(Debug)]
pub(crate) struct Acceptor {
    listener: TcpListener,
}

impl Acceptor {
    /// Bind the listening socket.
    ///
    /// # Errors
    /// Returns `ServerError::Bind` when the address is unavailable.
    pub(crate) async fn bind(addr: SocketAddr) -> Result<Self> {
        info!(%addr, "binding listener");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Acceptor { listener })
    }

    /// The actual bound address, useful when binding port 0.
    pub(crate) fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept until `shutdown` flips. Every connection gets a fresh
    /// [`ClientId`] and a detached session task.
    pub(crate) async fn run(self, app: Arc<AppShared>, mut shutdown: watch::Receiver<bool>) {
        info!("accept loop started");
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        let client_id = ClientId::generate();
                        debug!(client = %client_id.short(), %peer_addr, "connection accepted");
                        match ClientSession::new(client_id, stream, Arc::downgrade(&app)) {
                            Ok((session, read_half)) => {
                                app.insert_session(Arc::clone(&session));
                                info!(
                                    client = %client_id.short(),
                                    %peer_addr,
                                    total = app.session_count(),
                                    "client connected"
                                );
                                tokio::spawn(async move {
                                    session.run(read_half).await;
                                });
                            }
                            Err(error) => {
                                warn!(%peer_addr, %error, "failed to set up session");
                            }
                        }
                    }
                    Err(error) => {
                        warn!(%error, "accept failed, retrying");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("accept loop ended");
    }
}
