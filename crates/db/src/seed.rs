//! Startdaten fuer Fragen- und Formenkatalog
//!
//! Wird beim Serverstart ausgefuehrt und fuellt nur leere Kataloge.

use std::f64::consts::{PI, TAU};

use lastceo_core::types::{AnswerOption, Point};
use tracing::info;

use crate::models::{NeueForm, NeueFrage};
use crate::repository::{DbResult, QuizRepository, ShapeRepository};

/// (Frage, Optionen A-D, richtige Option, Schwierigkeit, Kategorie)
type FragenZeile = (&'static str, [&'static str; 4], AnswerOption, i64, &'static str);

const STANDARD_FRAGEN: &[FragenZeile] = &[
    ("Wofuer steht die Abkuerzung CEO?", ["Chief Executive Officer", "Central Economic Office", "Chief Engineering Operator", "Corporate Equity Owner"], AnswerOption::A, 1, "business"),
    ("Welche Kennzahl misst den Gewinn im Verhaeltnis zum eingesetzten Kapital?", ["EBIT", "ROI", "KPI", "CAGR"], AnswerOption::B, 2, "business"),
    ("Wie viele Bits hat ein Byte?", ["4", "16", "8", "10"], AnswerOption::C, 1, "technik"),
    ("Welcher Planet ist der Sonne am naechsten?", ["Venus", "Mars", "Erde", "Merkur"], AnswerOption::D, 1, "wissen"),
    ("Was beschreibt eine Bilanz?", ["Zahlungsstroeme eines Jahres", "Vermoegen und Kapital zu einem Stichtag", "Umsatz je Mitarbeiter", "Marktanteil einer Firma"], AnswerOption::B, 2, "business"),
    ("Welche Zahl ist eine Primzahl?", ["21", "27", "29", "33"], AnswerOption::C, 1, "mathe"),
    ("Was ist 15 Prozent von 200?", ["30", "25", "35", "20"], AnswerOption::A, 1, "mathe"),
    ("Welches Protokoll sichert Webseiten mit TLS ab?", ["FTP", "SMTP", "HTTPS", "SSH"], AnswerOption::C, 2, "technik"),
    ("Wie nennt man den ersten oeffentlichen Verkauf von Aktien?", ["Merger", "IPO", "Buyback", "Spin-off"], AnswerOption::B, 2, "business"),
    ("Wie viele Kontinente gibt es ueblicherweise?", ["5", "6", "8", "7"], AnswerOption::D, 1, "wissen"),
    ("Welche Form hat die meisten Ecken?", ["Dreieck", "Quadrat", "Fuenfeck", "Sechseck"], AnswerOption::D, 1, "mathe"),
    ("Was bedeutet 'Due Diligence'?", ["Sorgfaeltige Pruefung vor einer Transaktion", "Faelligkeit einer Rechnung", "Pflicht zur Dividende", "Eine Steuerart"], AnswerOption::A, 3, "business"),
];

/// Anzahl Stuetzpunkte der erzeugten Formen
const FORM_AUFLOESUNG: usize = 48;

// ---------------------------------------------------------------------------
// Formgeometrie (Zeichenrahmen 0..100, Mittelpunkt 50/50)
// ---------------------------------------------------------------------------

fn kreis() -> Vec<Point> {
    (0..FORM_AUFLOESUNG)
        .map(|i| {
            let w = TAU * i as f64 / FORM_AUFLOESUNG as f64;
            Point::new(50.0 + 40.0 * w.cos(), 50.0 + 40.0 * w.sin())
        })
        .collect()
}

fn regelmaessiges_vieleck(ecken: usize, radius: f64, drehung: f64) -> Vec<Point> {
    (0..ecken)
        .map(|i| {
            let w = drehung + TAU * i as f64 / ecken as f64;
            Point::new(50.0 + radius * w.cos(), 50.0 + radius * w.sin())
        })
        .collect()
}

fn stern() -> Vec<Point> {
    (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { 45.0 } else { 18.0 };
            let w = -PI / 2.0 + TAU * i as f64 / 10.0;
            Point::new(50.0 + radius * w.cos(), 50.0 + radius * w.sin())
        })
        .collect()
}

fn herz() -> Vec<Point> {
    // Klassische Herzkurve, auf den Rahmen skaliert
    (0..FORM_AUFLOESUNG)
        .map(|i| {
            let t = TAU * i as f64 / FORM_AUFLOESUNG as f64;
            let x = 16.0 * t.sin().powi(3);
            let y = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
            Point::new(50.0 + 2.5 * x, 50.0 - 2.5 * y)
        })
        .collect()
}

/// Alle Standardformen: (Typ, Geometrie, Schwierigkeit)
pub fn standard_formen() -> Vec<(&'static str, Vec<Point>, i64)> {
    vec![
        ("circle", kreis(), 1),
        ("triangle", regelmaessiges_vieleck(3, 42.0, -PI / 2.0), 1),
        ("square", regelmaessiges_vieleck(4, 42.0, PI / 4.0), 1),
        ("star", stern(), 3),
        ("heart", herz(), 2),
    ]
}

// ---------------------------------------------------------------------------
// Befuellen
// ---------------------------------------------------------------------------

/// Fuellt leere Kataloge mit den Standarddaten
///
/// `toleranz` und `zeitlimit_secs` gelten fuer alle erzeugten Formen.
pub async fn kataloge_befuellen<R>(repo: &R, toleranz: f64, zeitlimit_secs: f64) -> DbResult<()>
where
    R: QuizRepository + ShapeRepository,
{
    if repo.active_questions().await?.is_empty() {
        for (frage, optionen, richtig, schwierigkeit, kategorie) in STANDARD_FRAGEN {
            repo.create_question(NeueFrage {
                question: frage,
                options: *optionen,
                correct_answer: *richtig,
                difficulty: *schwierigkeit,
                category: kategorie,
            })
            .await?;
        }
        info!(anzahl = STANDARD_FRAGEN.len(), "Fragenkatalog befuellt");
    }

    if repo.active_shapes().await?.is_empty() {
        let formen = standard_formen();
        for (typ, geometrie, schwierigkeit) in &formen {
            repo.create_shape(NeueForm {
                shape_type: typ,
                geometry: geometrie,
                tolerance: toleranz,
                time_limit: zeitlimit_secs,
                difficulty: *schwierigkeit,
            })
            .await?;
        }
        info!(anzahl = formen.len(), "Formenkatalog befuellt");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formen_liegen_im_rahmen() {
        for (typ, geometrie, _) in standard_formen() {
            assert!(geometrie.len() >= 3, "{typ} hat zu wenige Punkte");
            for p in &geometrie {
                assert!(
                    (0.0..=100.0).contains(&p.x) && (0.0..=100.0).contains(&p.y),
                    "{typ}: Punkt ausserhalb des Rahmens: {p:?}"
                );
            }
        }
    }

    #[test]
    fn fragen_haben_vier_verschiedene_optionen() {
        for (frage, optionen, _, _, _) in STANDARD_FRAGEN {
            let mut sortiert = optionen.to_vec();
            sortiert.sort();
            sortiert.dedup();
            assert_eq!(sortiert.len(), 4, "Doppelte Option in '{frage}'");
        }
    }
}
