//! Client-Connection – verwaltet eine einzelne TCP-Verbindung
//!
//! ## Ablauf
//! ```text
//! Verbunden --list_sessions--> Verbunden
//!     |
//!   connect (Token + Session)
//!     v
//! Im Spiel: Frames -> Session-Actor, Hub-Queue -> Frames
//! ```
//!
//! Ungueltige Frames werden mit `error{invalid_message}` beantwortet, die
//! Verbindung bleibt bestehen. Abgelehnte `connect`-Versuche und
//! Persistenzfehler werden gemeldet und beenden die Verbindung.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use lastceo_core::types::UserId;
use lastceo_db::GameRepository;
use lastceo_game::{GameError, SessionHandle, Verbindung};
use lastceo_protocol::message::{ConnectRequest, SessionList};
use lastceo_protocol::wire::ServerCodec;
use lastceo_protocol::{ErrorCode, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::dispatcher::{self, Eingang};
use crate::error::{SignalingError, SignalingResult};
use crate::identity::IdentityProvider;
use crate::server_state::SignalingState;

type Rahmen = Framed<TcpStream, ServerCodec>;

/// Verbindung nach erfolgreichem `connect`
struct Sitzung {
    handle: SessionHandle,
    user_id: UserId,
    verbindung: Verbindung,
}

/// Wartet auf `true` im Shutdown-Kanal; ohne Sender nie
async fn shutdown_abwarten(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stopp| *stopp).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Verarbeitet eine einzelne TCP-Verbindung in einem eigenen Task
pub struct ClientConnection<R, I> {
    state: Arc<SignalingState<R, I>>,
    peer_addr: SocketAddr,
}

impl<R: GameRepository, I: IdentityProvider> ClientConnection<R, I> {
    pub fn neu(state: Arc<SignalingState<R, I>>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Laeuft bis der Client trennt, die Session endet, der Timeout
    /// greift oder der Server herunterfaehrt
    pub async fn verarbeiten(self, stream: TcpStream, mut shutdown_rx: watch::Receiver<bool>) {
        let peer = self.peer_addr;
        info!(%peer, "Neue Verbindung");

        let codec = ServerCodec::with_max_size(self.state.config.max_frame_groesse);
        let mut framed = Framed::new(stream, codec);

        let ergebnis = match self.anmelden(&mut framed, &mut shutdown_rx).await {
            Ok(Some(mut sitzung)) => {
                let ergebnis = self
                    .spielen(&mut framed, &mut sitzung, &mut shutdown_rx)
                    .await;
                sitzung.handle.trennen(sitzung.verbindung.verbindung_id).await;
                ergebnis
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        match ergebnis {
            Ok(()) => {}
            Err(SignalingError::Io(e)) => {
                debug!(%peer, fehler = %e, "Verbindungsfehler");
            }
            Err(e) => {
                debug!(%peer, fehler = %e, "Verbindung wird mit Fehler geschlossen");
                let _ = self.fehler_senden(&mut framed, &e).await;
            }
        }

        info!(%peer, "Verbindungs-Task beendet");
    }

    // -----------------------------------------------------------------------
    // Vor dem connect
    // -----------------------------------------------------------------------

    async fn anmelden(
        &self,
        framed: &mut Rahmen,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SignalingResult<Option<Sitzung>> {
        let timeout = self.state.config.verbindungs_timeout;
        loop {
            let frame = tokio::select! {
                frame = tokio::time::timeout(timeout, framed.next()) => frame,
                _ = shutdown_abwarten(shutdown_rx) => return Ok(None),
            };
            let Ok(frame) = frame else {
                debug!(peer = %self.peer_addr, "Kein connect innerhalb des Timeouts");
                return Ok(None);
            };

            let nachricht = match frame {
                None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Err(e))) => {
                    self.ungueltig_melden(framed, &e).await?;
                    continue;
                }
                Some(Ok(Ok(nachricht))) => nachricht,
            };

            trace!(peer = %self.peer_addr, typ = nachricht.typ(), "Nachricht vor connect");
            match dispatcher::zuordnen(nachricht) {
                Eingang::SessionsAuflisten => self.sessions_senden(framed).await?,
                Eingang::Verbinden(req) => return self.verbinden(req).await.map(Some),
                Eingang::Ereignis(_) => return Err(SignalingError::NichtAuthentifiziert),
            }
        }
    }

    async fn verbinden(&self, req: ConnectRequest) -> SignalingResult<Sitzung> {
        let user_id = self
            .state
            .identitaet
            .aufloesen(&req.token)
            .await?
            .ok_or(SignalingError::NichtAuthentifiziert)?;
        let handle = self
            .state
            .manager
            .handle(req.session_id)
            .ok_or(GameError::SessionNichtGefunden(req.session_id))?;

        let verbindung = handle.verbinden(user_id).await?;
        info!(
            peer = %self.peer_addr,
            session_id = %req.session_id,
            %user_id,
            teilnehmer = verbindung.teilnehmer_nummer,
            "Teilnehmer verbunden"
        );
        Ok(Sitzung {
            handle,
            user_id,
            verbindung,
        })
    }

    // -----------------------------------------------------------------------
    // Im Spiel
    // -----------------------------------------------------------------------

    async fn spielen(
        &self,
        framed: &mut Rahmen,
        sitzung: &mut Sitzung,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let peer = self.peer_addr;
        let timeout = self.state.config.verbindungs_timeout;
        let mut letzter_empfang = Instant::now();

        loop {
            tokio::select! {
                frame = framed.next() => {
                    let nachricht = match frame {
                        None => {
                            info!(%peer, "Verbindung vom Client getrennt");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            warn!(%peer, fehler = %e, "Frame-Lesefehler");
                            return Ok(());
                        }
                        Some(Ok(Err(e))) => {
                            letzter_empfang = Instant::now();
                            self.ungueltig_melden(framed, &e).await?;
                            continue;
                        }
                        Some(Ok(Ok(nachricht))) => nachricht,
                    };
                    letzter_empfang = Instant::now();
                    trace!(%peer, typ = nachricht.typ(), "Nachricht empfangen");

                    match dispatcher::zuordnen(nachricht) {
                        Eingang::SessionsAuflisten => self.sessions_senden(framed).await?,
                        Eingang::Verbinden(_) => {
                            self.fehler_senden(framed, &SignalingError::protokoll("Bereits verbunden"))
                                .await?;
                        }
                        Eingang::Ereignis(ereignis) => {
                            match sitzung.handle.ereignis(sitzung.user_id, ereignis).await {
                                Ok(()) => {}
                                Err(e @ (GameError::Persistenz(_) | GameError::SessionNichtGefunden(_))) => {
                                    return Err(e.into());
                                }
                                Err(e) => self.fehler_senden(framed, &e.into()).await?,
                            }
                        }
                    }
                }

                ausgehend = sitzung.verbindung.empfaenger.recv() => {
                    let Some(nachricht) = ausgehend else {
                        debug!(%peer, "Session beendet, Verbindung wird geschlossen");
                        return Ok(());
                    };
                    framed.send(nachricht).await?;
                }

                _ = tokio::time::sleep_until(letzter_empfang + timeout) => {
                    warn!(%peer, "Verbindungs-Timeout");
                    return Ok(());
                }

                _ = shutdown_abwarten(shutdown_rx) => {
                    info!(%peer, "Shutdown-Signal, Verbindung wird getrennt");
                    let abschied = ServerMessage::fehler(ErrorCode::Internal, "Server wird heruntergefahren");
                    let _ = framed.send(abschied).await;
                    return Ok(());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Antworten
    // -----------------------------------------------------------------------

    async fn sessions_senden(&self, framed: &mut Rahmen) -> SignalingResult<()> {
        let sessions = self.state.manager.offene_sessions().await;
        framed
            .send(ServerMessage::SessionList(SessionList { sessions }))
            .await?;
        Ok(())
    }

    async fn ungueltig_melden(
        &self,
        framed: &mut Rahmen,
        fehler: &serde_json::Error,
    ) -> SignalingResult<()> {
        debug!(peer = %self.peer_addr, %fehler, "Ungueltige Nachricht");
        self.state
            .metriken
            .abgelehnt(ErrorCode::InvalidMessage.als_str());
        framed
            .send(ServerMessage::fehler(
                ErrorCode::InvalidMessage,
                format!("Ungueltige Nachricht: {fehler}"),
            ))
            .await?;
        Ok(())
    }

    async fn fehler_senden(&self, framed: &mut Rahmen, fehler: &SignalingError) -> SignalingResult<()> {
        let code = fehler.fehler_code();
        self.state.metriken.abgelehnt(code.als_str());
        framed
            .send(ServerMessage::fehler(code, fehler.to_string()))
            .await?;
        Ok(())
    }
}
