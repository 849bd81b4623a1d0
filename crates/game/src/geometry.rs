//! Geometrischer Formvergleich fuer die Zeichenstufe
//!
//! Ziel und Zeichnung werden entlang der Bogenlaenge auf gleich viele,
//! gleichabstaendige Punkte umgerechnet. Die Abweichung ist die symmetrische
//! mittlere Naechster-Punkt-Distanz (Chamfer-Distanz), normiert auf die
//! Diagonale der Ziel-Bounding-Box. Startpunkt und Zeichenrichtung spielen
//! dadurch keine Rolle.

use lastceo_core::types::Point;

/// Ergebnis einer Formbewertung
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bewertung {
    /// 0.0 (voellig daneben) bis 1.0 (deckungsgleich)
    pub genauigkeit: f64,
    pub abweichung: f64,
    pub erfolgreich: bool,
}

impl Bewertung {
    fn fehlgeschlagen() -> Self {
        Self {
            genauigkeit: 0.0,
            abweichung: f64::INFINITY,
            erfolgreich: false,
        }
    }
}

/// Verteilt `anzahl` Punkte gleichmaessig entlang des Polygonzugs
///
/// Bei `geschlossen` wird das Segment vom letzten zum ersten Punkt
/// mitgezaehlt und der Endpunkt nicht doppelt erzeugt.
pub fn neu_abtasten(punkte: &[Point], anzahl: usize, geschlossen: bool) -> Vec<Point> {
    let Some(&erster) = punkte.first() else {
        return Vec::new();
    };
    if anzahl == 0 {
        return Vec::new();
    }

    let mut kette: Vec<Point> = punkte.to_vec();
    if geschlossen {
        kette.push(erster);
    }

    let segmente: Vec<f64> = kette.windows(2).map(|w| w[0].abstand(&w[1])).collect();
    let gesamt: f64 = segmente.iter().sum();
    if gesamt <= f64::EPSILON {
        return vec![erster; anzahl];
    }

    let schritt = if geschlossen || anzahl == 1 {
        gesamt / anzahl as f64
    } else {
        gesamt / (anzahl - 1) as f64
    };

    let mut ergebnis = Vec::with_capacity(anzahl);
    let mut segment = 0;
    let mut vor_segment = 0.0;
    for i in 0..anzahl {
        let ziel = (schritt * i as f64).min(gesamt);
        while segment + 1 < segmente.len() && vor_segment + segmente[segment] < ziel {
            vor_segment += segmente[segment];
            segment += 1;
        }
        let laenge = segmente[segment];
        let anteil = if laenge > 0.0 {
            ((ziel - vor_segment) / laenge).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (a, b) = (kette[segment], kette[segment + 1]);
        ergebnis.push(Point::new(
            a.x + (b.x - a.x) * anteil,
            a.y + (b.y - a.y) * anteil,
        ));
    }
    ergebnis
}

fn mittlerer_naechster_abstand(von: &[Point], zu: &[Point]) -> f64 {
    let summe: f64 = von
        .iter()
        .map(|p| {
            zu.iter()
                .map(|q| p.abstand(q))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    summe / von.len() as f64
}

/// Symmetrische Chamfer-Distanz zweier Punktmengen
pub fn chamfer_distanz(a: &[Point], b: &[Point]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return f64::INFINITY;
    }
    (mittlerer_naechster_abstand(a, b) + mittlerer_naechster_abstand(b, a)) / 2.0
}

fn bbox_diagonale(punkte: &[Point]) -> f64 {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in punkte {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Point::new(min_x, min_y).abstand(&Point::new(max_x, max_y))
}

/// Bewertet eine Zeichnung gegen die Zielform
pub fn bewerten(
    ziel: &[Point],
    zeichnung: &[Point],
    toleranz: f64,
    abtastpunkte: usize,
    max_punkte: usize,
) -> Bewertung {
    if zeichnung.len() < 2
        || zeichnung.len() > max_punkte
        || ziel.len() < 2
        || !zeichnung.iter().all(Point::ist_endlich)
    {
        return Bewertung::fehlgeschlagen();
    }

    let ziel_abgetastet = neu_abtasten(ziel, abtastpunkte, true);
    let zeichnung_abgetastet = neu_abtasten(zeichnung, abtastpunkte, false);

    let diagonale = bbox_diagonale(ziel);
    let norm = if diagonale > f64::EPSILON { diagonale } else { 1.0 };
    let abweichung = chamfer_distanz(&ziel_abgetastet, &zeichnung_abgetastet) / norm;
    if !abweichung.is_finite() {
        return Bewertung::fehlgeschlagen();
    }

    Bewertung {
        genauigkeit: (1.0 - abweichung).clamp(0.0, 1.0),
        abweichung,
        erfolgreich: abweichung <= toleranz,
    }
}
