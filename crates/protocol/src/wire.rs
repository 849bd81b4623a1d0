//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Length(u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE)                   | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Der Codec ist generisch ueber den dekodierten Typ: der Server liest
//! `ClientMessage` und schreibt `ServerMessage`, ein Client umgekehrt.
//! Framing-Fehler beenden den Stream, ein einzelner Frame mit ungueltigem
//! JSON wird als `Err` im Item geliefert und die Verbindung bleibt nutzbar.

use std::io;
use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};

use crate::message::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// `D` ist der Typ der eingehenden Nachrichten. Kodiert werden kann jeder
/// `Serialize`-Typ.
#[derive(Debug)]
pub struct FrameCodec<D> {
    max_frame_size: usize,
    _eingang: PhantomData<fn() -> D>,
}

/// Codec der Serverseite
pub type ServerCodec = FrameCodec<ClientMessage>;

/// Codec der Clientseite
pub type ClientCodec = FrameCodec<ServerMessage>;

impl<D> FrameCodec<D> {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _eingang: PhantomData,
        }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<D> Default for FrameCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for FrameCodec<D> {
    fn clone(&self) -> Self {
        Self::with_max_size(self.max_frame_size)
    }
}

fn zu_gross(laenge: usize, maximum: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Frame zu gross: {} Bytes (Maximum: {} Bytes)", laenge, maximum),
    )
}

// ---------------------------------------------------------------------------
// Decoder / Encoder
// ---------------------------------------------------------------------------

impl<D: DeserializeOwned> Decoder for FrameCodec<D> {
    type Item = Result<D, serde_json::Error>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if length > self.max_frame_size {
            return Err(zu_gross(length, self.max_frame_size));
        }

        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        Ok(Some(serde_json::from_slice(&payload)))
    }
}

impl<D, T: Serialize> Encoder<T> for FrameCodec<D> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(zu_gross(json.len(), self.max_frame_size));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatRequest, ErrorCode, ReadyCheck};

    fn chat(text: &str) -> ClientMessage {
        ClientMessage::ChatMessage(ChatRequest {
            message: text.to_string(),
        })
    }

    #[test]
    fn server_liest_was_client_schreibt() {
        let mut client = ClientCodec::new();
        let mut server = ServerCodec::new();

        let mut buf = BytesMut::new();
        client.encode(chat("hallo"), &mut buf).unwrap();

        let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + payload_len);

        let decoded = server.decode(&mut buf).unwrap().expect("Nachricht erwartet");
        assert_eq!(decoded.unwrap(), chat("hallo"));
    }

    #[test]
    fn unvollstaendiger_frame_wartet() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(ClientMessage::ReadyCheck(ReadyCheck {}), &mut buf)
            .unwrap();

        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        let mut kurz = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut kurz).unwrap().is_none());
    }

    #[test]
    fn zu_grosser_frame_wird_abgelehnt() {
        let mut codec = ServerCodec::with_max_size(100);
        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);
        assert!(codec.decode(&mut buf).is_err());

        let mut klein = ClientCodec::with_max_size(10);
        let mut out = BytesMut::new();
        assert!(klein
            .encode(ServerMessage::fehler(ErrorCode::Internal, "x"), &mut out)
            .is_err());
    }

    #[test]
    fn ungueltiges_json_betrifft_nur_den_frame() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        let muell = br#"{"type":"fly"}"#;
        buf.put_u32(muell.len() as u32);
        buf.put_slice(muell);
        codec.encode(chat("danach"), &mut buf).unwrap();

        let erster = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
        assert!(erster.is_err());
        let zweiter = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
        assert_eq!(zweiter.unwrap(), chat("danach"));
        assert!(buf.is_empty());
    }

    #[test]
    fn mehrere_nachrichten_im_buffer() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        for i in 0..3 {
            codec.encode(chat(&format!("n{}", i)), &mut buf).unwrap();
        }
        for i in 0..3 {
            let msg = codec.decode(&mut buf).unwrap().expect("Nachricht erwartet");
            assert_eq!(msg.unwrap(), chat(&format!("n{}", i)));
        }
        assert!(buf.is_empty());
    }
}
