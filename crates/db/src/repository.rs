//! Repository-Traits
//!
//! Die Spiel-Crates greifen ausschliesslich ueber diese Traits auf die
//! Persistenz zu. Alle Futures sind `Send`, damit Session-Actors auf dem
//! Multi-Thread-Runtime laufen koennen.

use std::future::Future;

use chrono::{DateTime, Utc};
use lastceo_core::types::{ParticipantId, Point, SessionId, StageId, UserId};

use crate::error::DbError;
use crate::models::{
    Abrechnung, AntwortRecord, BewegungRecord, ChatRecord, Einschreibung, FormRecord,
    FrageRecord, KontoRecord, NeueForm, NeueFrage, NeueSession, NeuesKonto, SessionRecord,
    StatistikRecord, StufenWechsel, TeilnehmerRecord, VersuchGespeichert, VersuchRecord,
};

/// Result-Alias fuer Datenbankoperationen
pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Verbindungsparameter fuer den SQLite-Pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Verbindungs-URL (z.B. "sqlite://lastceo.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen im Pool
    pub max_verbindungen: u32,
    /// Ob der WAL-Modus aktiviert werden soll
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lastceo.db".into(),
            max_verbindungen: 5,
            sqlite_wal: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Konten: Profil, Guthaben, Zugangstoken
pub trait AccountRepository: Send + Sync {
    fn create_account(
        &self,
        data: NeuesKonto<'_>,
    ) -> impl Future<Output = DbResult<KontoRecord>> + Send;

    fn get_account(&self, id: UserId)
        -> impl Future<Output = DbResult<Option<KontoRecord>>> + Send;

    /// Loest ein Zugangstoken zu einem Konto auf
    fn get_account_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = DbResult<Option<KontoRecord>>> + Send;
}

/// Sessions und ihre Stufenwechsel
pub trait SessionRepository: Send + Sync {
    fn create_session(
        &self,
        data: NeueSession,
    ) -> impl Future<Output = DbResult<SessionRecord>> + Send;

    fn get_session(
        &self,
        id: SessionId,
    ) -> impl Future<Output = DbResult<Option<SessionRecord>>> + Send;

    /// Alle Sessions, die noch nicht beendet sind, aelteste zuerst
    fn list_unfinished_sessions(&self)
        -> impl Future<Output = DbResult<Vec<SessionRecord>>> + Send;

    /// Schreibt Status, Stufenindex und Stufenstart. Der erste Eintritt in
    /// das Quiz setzt zusaetzlich `started_at`. Beendete Sessions bleiben
    /// unveraendert.
    fn record_stage(
        &self,
        id: SessionId,
        wechsel: StufenWechsel,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

/// Teilnehmer einer Session
pub trait ParticipantRepository: Send + Sync {
    /// Schreibt einen Benutzer ein: bucht die Startgebuehr ab, vergibt die
    /// kleinste freie Teilnehmernummer und erhoeht den Preispool, alles in
    /// einer Transaktion. Ist der Benutzer bereits eingeschrieben, wird
    /// nichts veraendert.
    fn enroll(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> impl Future<Output = DbResult<Einschreibung>> + Send;

    /// Alle Teilnehmer einer Session, sortiert nach Teilnehmernummer
    fn list_participants(
        &self,
        session_id: SessionId,
    ) -> impl Future<Output = DbResult<Vec<TeilnehmerRecord>>> + Send;

    /// Markiert einen lebenden Teilnehmer als ausgeschieden.
    /// Gibt `false` zurueck, wenn er bereits ausgeschieden war.
    fn eliminate(
        &self,
        id: ParticipantId,
        stage: StageId,
        zeitpunkt: DateTime<Utc>,
    ) -> impl Future<Output = DbResult<bool>> + Send;

    fn update_position(
        &self,
        id: ParticipantId,
        position: Point,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

/// Fragenkatalog und Antworten
pub trait QuizRepository: Send + Sync {
    fn create_question(
        &self,
        data: NeueFrage<'_>,
    ) -> impl Future<Output = DbResult<FrageRecord>> + Send;

    /// Alle aktiven Fragen, sortiert nach ID
    fn active_questions(&self) -> impl Future<Output = DbResult<Vec<FrageRecord>>> + Send;

    /// Speichert eine Antwort. `false` wenn fuer dieses Paar aus
    /// Teilnehmer und Frage bereits eine Antwort existiert.
    fn record_answer(
        &self,
        antwort: &AntwortRecord,
    ) -> impl Future<Output = DbResult<bool>> + Send;

    fn list_answers(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = DbResult<Vec<AntwortRecord>>> + Send;
}

/// Bewegungsprotokoll der Stop/Go-Stufe
pub trait MovementRepository: Send + Sync {
    /// Speichert eine Bewegung. Ist sie als `eliminated` markiert, wird der
    /// Teilnehmer in derselben Transaktion in der Bewegungsstufe
    /// ausgeschieden. Ein zweiter Aufruf mit demselben Teilnehmer und
    /// Zeitpunkt legt keinen weiteren Eintrag an.
    fn record_movement(
        &self,
        bewegung: &BewegungRecord,
    ) -> impl Future<Output = DbResult<()>> + Send;

    fn list_movements(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = DbResult<Vec<BewegungRecord>>> + Send;
}

/// Formenkatalog und Zeichenversuche
pub trait ShapeRepository: Send + Sync {
    fn create_shape(&self, data: NeueForm<'_>)
        -> impl Future<Output = DbResult<FormRecord>> + Send;

    fn active_shapes(&self) -> impl Future<Output = DbResult<Vec<FormRecord>>> + Send;

    /// Speichert einen Versuch, sofern der Teilnehmer in dieser Session noch
    /// nicht gezeichnet hat. Ist der gespeicherte Versuch gescheitert, wird
    /// der Teilnehmer in derselben Transaktion in der Formenstufe
    /// ausgeschieden.
    fn record_attempt(
        &self,
        versuch: &VersuchRecord,
    ) -> impl Future<Output = DbResult<VersuchGespeichert>> + Send;

    fn list_attempts(
        &self,
        session_id: SessionId,
    ) -> impl Future<Output = DbResult<Vec<VersuchRecord>>> + Send;
}

/// Abschluss einer Session
pub trait SettlementRepository: Send + Sync {
    /// Schreibt Gutschriften, Statistik und den Endstatus in einer
    /// Transaktion. `false` wenn die Session bereits abgeschlossen war,
    /// dann wurde nichts gebucht.
    fn settle(&self, abrechnung: &Abrechnung) -> impl Future<Output = DbResult<bool>> + Send;

    fn get_statistics(
        &self,
        session_id: SessionId,
    ) -> impl Future<Output = DbResult<Option<StatistikRecord>>> + Send;
}

/// Chatverlauf einer Session
pub trait ChatRepository: Send + Sync {
    fn save_message(
        &self,
        session_id: SessionId,
        participant_id: Option<ParticipantId>,
        message: &str,
    ) -> impl Future<Output = DbResult<ChatRecord>> + Send;

    /// Die letzten `limit` Nachrichten, aelteste zuerst
    fn chat_history(
        &self,
        session_id: SessionId,
        limit: u32,
    ) -> impl Future<Output = DbResult<Vec<ChatRecord>>> + Send;
}

/// Alle Repositories, die ein Session-Actor benoetigt
pub trait GameRepository:
    AccountRepository
    + SessionRepository
    + ParticipantRepository
    + QuizRepository
    + MovementRepository
    + ShapeRepository
    + SettlementRepository
    + ChatRepository
    + Clone
    + 'static
{
}

impl<T> GameRepository for T where
    T: AccountRepository
        + SessionRepository
        + ParticipantRepository
        + QuizRepository
        + MovementRepository
        + ShapeRepository
        + SettlementRepository
        + ChatRepository
        + Clone
        + 'static
{
}
