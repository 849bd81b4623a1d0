//! lastceo-protocol – Nachrichtenformat zwischen Client und Server
//!
//! Definiert die getaggten Nachrichtenumschlaege beider Richtungen und
//! den laengenpraefixierten JSON-Codec fuer TCP-Verbindungen.

pub mod message;
pub mod wire;

pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use wire::FrameCodec;
