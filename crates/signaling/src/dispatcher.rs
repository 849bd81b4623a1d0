//! Message-Dispatcher – ordnet Client-Nachrichten ihrem Ziel zu
//!
//! `connect` und `list_sessions` beantwortet die Verbindung selbst, alle
//! Spielnachrichten gehen als `Spielereignis` an den Session-Actor.

use lastceo_core::types::Point;
use lastceo_game::Spielereignis;
use lastceo_protocol::message::ConnectRequest;
use lastceo_protocol::ClientMessage;

/// Ziel einer eingehenden Nachricht
#[derive(Debug, Clone, PartialEq)]
pub enum Eingang {
    Verbinden(ConnectRequest),
    SessionsAuflisten,
    Ereignis(Spielereignis),
}

/// Ordnet eine dekodierte Client-Nachricht zu
pub fn zuordnen(nachricht: ClientMessage) -> Eingang {
    match nachricht {
        ClientMessage::Connect(req) => Eingang::Verbinden(req),
        ClientMessage::ListSessions(_) => Eingang::SessionsAuflisten,
        ClientMessage::ChatMessage(req) => Eingang::Ereignis(Spielereignis::Chat(req.message)),
        ClientMessage::ReadyCheck(_) => Eingang::Ereignis(Spielereignis::Bereit),
        ClientMessage::QuizAnswer(req) => Eingang::Ereignis(Spielereignis::QuizAntwort {
            question_id: req.question_id,
            answer: req.answer,
            time_taken: req.time_taken,
        }),
        ClientMessage::PlayerMovement(req) => {
            Eingang::Ereignis(Spielereignis::Bewegung(Point::new(req.x, req.y)))
        }
        ClientMessage::ShapeDrawing(req) => Eingang::Ereignis(Spielereignis::Zeichnung {
            shape_id: req.shape_id,
            punkte: req.drawing_data,
            time_taken: req.time_taken,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastceo_core::types::AnswerOption;

    fn aus_json(json: &str) -> Eingang {
        zuordnen(ClientMessage::from_json(json).unwrap())
    }

    #[test]
    fn spielnachrichten_werden_ereignisse() {
        assert_eq!(
            aus_json(r#"{"type":"ready_check","payload":{}}"#),
            Eingang::Ereignis(Spielereignis::Bereit)
        );
        assert_eq!(
            aus_json(r#"{"type":"player_movement","payload":{"x":12.5,"y":3}}"#),
            Eingang::Ereignis(Spielereignis::Bewegung(Point::new(12.5, 3.0)))
        );
        assert_eq!(
            aus_json(
                r#"{"type":"quiz_answer","payload":{"question_id":4,"answer":"C","time_taken":2.5}}"#
            ),
            Eingang::Ereignis(Spielereignis::QuizAntwort {
                question_id: 4,
                answer: AnswerOption::C,
                time_taken: 2.5,
            })
        );
    }

    #[test]
    fn zeichnung_behaelt_alle_punkte() {
        let eingang = aus_json(
            r#"{"type":"shape_drawing","payload":{"shape_id":2,"drawing_data":[{"x":1,"y":2},{"x":3,"y":4}],"time_taken":9}}"#,
        );
        let Eingang::Ereignis(Spielereignis::Zeichnung { shape_id, punkte, .. }) = eingang else {
            panic!("Zeichnung erwartet, erhalten: {eingang:?}");
        };
        assert_eq!(shape_id, 2);
        assert_eq!(punkte, [Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
    }

    #[test]
    fn verbindungsnachrichten() {
        assert_eq!(
            aus_json(r#"{"type":"list_sessions","payload":{}}"#),
            Eingang::SessionsAuflisten
        );
        assert!(matches!(
            aus_json(
                r#"{"type":"connect","payload":{"session_id":"6f1c1a8e-3e0a-4f59-9d59-1c4b7f2c9a10","token":"t"}}"#
            ),
            Eingang::Verbinden(req) if req.token == "t"
        ));
    }
}
