//! lastceo-signaling – TCP-Schicht von LastCEO
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  list_sessions* -> connect -> Spielnachrichten
//!     |
//!     v
//! Dispatcher -> SessionHandle (Session-Actor)
//!
//! IdentityProvider – Token -> Benutzer
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod server_state;
pub mod tcp;

pub use connection::ClientConnection;
pub use error::{SignalingError, SignalingResult};
pub use identity::IdentityProvider;
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
