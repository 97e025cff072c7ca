//! Spam-Wache fuer wiederholte Beitrittsversuche
//!
//! Zaehlt pro Benutzer die Beitrittsversuche in Kanaele in denen der
//! Benutzer bereits Mitglied ist. Ueberschreitet der Zaehler die Schwelle,
//! meldet `duplikat_vermerken` das Ausloesen und setzt den Zaehler auf 0;
//! der Aufrufer schliesst daraufhin die Verbindung mit Code 1008.
//!
//! Der Zaehler verfaellt nicht mit der Zeit und wird beim Verbindungsabbau
//! nicht geleert (Referenzverhalten, siehe DESIGN.md).

use std::collections::HashMap;

/// Schwelle: der sechste Duplikat-Versuch loest aus
pub const SPAM_SCHWELLE: u32 = 5;

/// Begruendung im Close-Frame beim Ausloesen
pub const SPAM_GRUND: &str = "Please don't spam the server.";

/// Zaehler fuer Duplikat-Beitritte, indiziert nach Benutzername
#[derive(Debug, Default)]
pub struct SpamWache {
    zaehler: HashMap<String, u32>,
    schwelle: u32,
}

impl SpamWache {
    /// Erstellt eine Wache mit der Standard-Schwelle
    pub fn neu() -> Self {
        Self {
            zaehler: HashMap::new(),
            schwelle: SPAM_SCHWELLE,
        }
    }

    /// Vermerkt einen Duplikat-Beitrittsversuch.
    ///
    /// Gibt `true` zurueck wenn die Schwelle ueberschritten wurde; der
    /// Zaehler des Benutzers ist dann bereits auf 0 zurueckgesetzt.
    pub fn duplikat_vermerken(&mut self, benutzername: &str) -> bool {
        let eintrag = self.zaehler.entry(benutzername.to_string()).or_insert(0);
        *eintrag += 1;

        if *eintrag > self.schwelle {
            *eintrag = 0;
            tracing::warn!(benutzer = benutzername, "Spam-Schwelle ueberschritten");
            return true;
        }

        tracing::debug!(
            benutzer = benutzername,
            versuche = *eintrag,
            "Duplikat-Beitritt vermerkt"
        );
        false
    }

    /// Aktueller Zaehlerstand eines Benutzers
    pub fn stand(&self, benutzername: &str) -> u32 {
        self.zaehler.get(benutzername).copied().unwrap_or(0)
    }
}
