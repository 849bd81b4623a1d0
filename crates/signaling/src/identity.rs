//! Identity-Provider – loest Zugangstoken zu Benutzern auf
//!
//! Die Ausgabe der Token liegt ausserhalb des Servers. Die SQLite-
//! Implementierung sucht das Token in `users.access_token`.

use std::future::Future;

use lastceo_core::types::UserId;
use lastceo_db::{AccountRepository, SqliteDb};

use crate::error::SignalingResult;

/// Token -> Benutzer
pub trait IdentityProvider: Send + Sync + 'static {
    /// `None` wenn das Token unbekannt ist
    fn aufloesen(&self, token: &str) -> impl Future<Output = SignalingResult<Option<UserId>>> + Send;
}

impl IdentityProvider for SqliteDb {
    async fn aufloesen(&self, token: &str) -> SignalingResult<Option<UserId>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.get_account_by_token(token).await?.map(|k| k.id))
    }
}
