//! Gemeinsame Identifikationstypen fuer Plauderei
//!
//! Kanal-IDs verwenden das Newtype-Pattern um Verwechslungen mit anderen
//! UUID-Werten zur Compilezeit auszuschliessen. Benutzer werden ueber ihren
//! Benutzernamen identifiziert (eindeutig fuer die Lebensdauer der
//! Verbindung), daher gibt es dafuer kein eigenes Newtype.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Absendername fuer alle server-seitig erzeugten Nachrichten
pub const ABSENDER_ADMIN: &str = "Admin";

/// Reservierter Benutzername (case-insensitiv geprueft)
pub const RESERVIERTER_NAME: &str = "admin";

/// WebSocket-Schliesscodes die der Server verwendet
pub mod schliess_code {
    /// Policy-Verletzung: fehlender/doppelter/reservierter Benutzername, Spam
    pub const RICHTLINIEN_VERSTOSS: u16 = 1008;
    /// Abnormaler Abbruch (Standard wenn kein expliziter Code angegeben ist)
    pub const ABNORMAL: u16 = 1006;
}

/// Eindeutige Kanal-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KanalId(pub Uuid);

impl KanalId {
    /// Erstellt eine neue zufaellige KanalId
    pub fn neu() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parst eine KanalId aus ihrer Wire-Darstellung.
    ///
    /// Gibt `None` zurueck wenn der String keine UUID ist – der Aufrufer
    /// behandelt das wie einen unbekannten Kanal.
    pub fn parsen(roh: &str) -> Option<Self> {
        Uuid::parse_str(roh).ok().map(Self)
    }
}

impl std::fmt::Display for KanalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
