//! TCP-Listener – bindet den Socket und akzeptiert Verbindungen
//!
//! Jede Verbindung laeuft als eigener tokio-Task mit einer
//! `ClientConnection`. Die Repository-Futures sind `Send`, die Tasks
//! duerfen daher auf dem Multi-Thread-Runtime laufen.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lastceo_db::GameRepository;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::connection::ClientConnection;
use crate::identity::IdentityProvider;
use crate::server_state::SignalingState;

/// TCP-Server fuer Spielverbindungen
pub struct SignalingServer<R, I> {
    state: Arc<SignalingState<R, I>>,
    bind_addr: SocketAddr,
}

impl<R: GameRepository, I: IdentityProvider> SignalingServer<R, I> {
    pub fn neu(state: Arc<SignalingState<R, I>>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bindet die konfigurierte Adresse und akzeptiert bis zum Shutdown
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.annehmen(listener, shutdown_rx).await
    }

    /// Accept-Loop auf einem bereits gebundenen Listener
    pub async fn annehmen(
        self,
        listener: TcpListener,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        info!(adresse = %listener.local_addr()?, "TCP-Server gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            if !self.state.verbindung_belegen() {
                                warn!(
                                    %peer,
                                    max = self.state.config.max_verbindungen,
                                    "Server voll, Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }
                            if let Err(e) = stream.set_nodelay(true) {
                                debug!(%peer, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let state = Arc::clone(&self.state);
                            let verbindung = ClientConnection::neu(Arc::clone(&state), peer);
                            let shutdown = shutdown_rx.clone();
                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown).await;
                                state.verbindung_freigeben();
                            });
                        }
                        Err(e) => {
                            error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("TCP-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        info!(
            uptime_sek = self.state.uptime_sek(),
            offen = self.state.verbindungen(),
            "TCP-Server gestoppt"
        );
        Ok(())
    }
}
