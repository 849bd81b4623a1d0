//! Stufen-Timer des Session-Actors
//!
//! Ein Timer ist ein eigener Task, der schlaeft und danach `Timer{epoch, art}`
//! ueber einen schwachen Sender in die Befehls-Queue stellt. Jeder
//! Stufenwechsel und jede vorzeitige Beendigung beginnt eine neue Epoche und
//! bricht alle laufenden Timer ab; Timer einer alten Epoche, die schon in der
//! Queue stehen, verwirft der Actor.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::SessionCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerArt {
    /// Controller der aktuellen Stufe (erneut) starten
    StufeStarten,
    /// Zeitlimit einer Quizfrage abgelaufen
    FrageEnde { index: usize },
    /// Aufloesungspause vorbei, naechste Frage stellen
    NaechsteFrage { index: usize },
    PhasenWechsel,
    /// Zeitbudget der aktuellen Stufe ausgeschoepft
    StufenEnde,
    /// Vorgemerkte Entscheidungen erneut schreiben
    Nachholen,
    /// Nach einem Neustart unterbrochene Stufe abrechnen
    Wiederaufnahme,
    /// Aufbewahrungszeit nach FINISHED vorbei
    Aufraeumen,
}

pub(crate) struct Timers {
    epoch: u64,
    laufend: Vec<JoinHandle<()>>,
    tx: mpsc::WeakSender<SessionCommand>,
}

impl Timers {
    pub(crate) fn neu(tx: mpsc::WeakSender<SessionCommand>) -> Self {
        Self {
            epoch: 0,
            laufend: Vec::new(),
            tx,
        }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn ist_aktuell(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Beginnt eine neue Epoche und bricht alle laufenden Timer ab
    pub(crate) fn neue_epoche(&mut self) {
        self.epoch += 1;
        for handle in self.laufend.drain(..) {
            handle.abort();
        }
    }

    /// Plant einen Timer in der aktuellen Epoche
    pub(crate) fn planen(&mut self, dauer: Duration, art: TimerArt) {
        let epoch = self.epoch;
        let tx = self.tx.clone();
        self.laufend.retain(|h| !h.is_finished());
        self.laufend.push(tokio::spawn(async move {
            tokio::time::sleep(dauer).await;
            // Actor bereits beendet -> nichts zu tun
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(SessionCommand::Timer { epoch, art }).await;
            }
        }));
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for handle in self.laufend.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timer_meldet_sich_mit_epoche() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = Timers::neu(tx.downgrade());
        timers.planen(Duration::from_secs(5), TimerArt::PhasenWechsel);

        match rx.recv().await {
            Some(SessionCommand::Timer { epoch, art }) => {
                assert_eq!(epoch, 0);
                assert_eq!(art, TimerArt::PhasenWechsel);
            }
            _ => panic!("Timer-Befehl erwartet"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn neue_epoche_bricht_timer_ab() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = Timers::neu(tx.downgrade());
        timers.planen(Duration::from_secs(5), TimerArt::StufenEnde);
        timers.neue_epoche();
        assert!(!timers.ist_aktuell(0));
        timers.planen(Duration::from_secs(10), TimerArt::Aufraeumen);

        match rx.recv().await {
            Some(SessionCommand::Timer { epoch, art }) => {
                assert_eq!(epoch, 1);
                assert_eq!(art, TimerArt::Aufraeumen);
            }
            _ => panic!("Timer-Befehl erwartet"),
        }
    }
}
