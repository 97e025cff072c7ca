//! Registry der verbundenen Benutzer
//!
//! Ein Benutzername identifiziert genau eine Verbindung; die Zulassung
//! passiert hier (leer, vergeben, reserviert). Der Router ist der einzige
//! Aufrufer, daher reicht eine unsynchronisierte Map.

use std::collections::HashMap;

use plauderei_core::types::RESERVIERTER_NAME;
use plauderei_core::verbindung::Verbindung;
use plauderei_protocol::Ausgehend;

use crate::error::ZugangsFehler;

/// Verwaltet die aktiven Sitzungen (Benutzername -> Verbindung)
#[derive(Default)]
pub struct SitzungsVerwaltung {
    benutzer: HashMap<String, Verbindung>,
}

impl SitzungsVerwaltung {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Laesst einen neuen Benutzer zu.
    ///
    /// Der reservierte Admin-Name wird case-insensitiv abgelehnt, damit
    /// sich niemand als Absender der Systemnachrichten ausgeben kann.
    pub fn registrieren(
        &mut self,
        benutzername: &str,
        verbindung: Verbindung,
    ) -> Result<(), ZugangsFehler> {
        if benutzername.is_empty() {
            return Err(ZugangsFehler::BenutzernameFehlt);
        }
        if benutzername.eq_ignore_ascii_case(RESERVIERTER_NAME) {
            return Err(ZugangsFehler::BenutzernameReserviert);
        }
        if self.benutzer.contains_key(benutzername) {
            return Err(ZugangsFehler::BenutzernameVergeben);
        }

        self.benutzer.insert(benutzername.to_string(), verbindung);
        tracing::info!(benutzer = benutzername, aktiv = self.benutzer.len(), "Sitzung registriert");
        Ok(())
    }

    /// Entfernt eine Sitzung (Verbindungsabbau)
    pub fn entfernen(&mut self, benutzername: &str) {
        if self.benutzer.remove(benutzername).is_some() {
            tracing::info!(benutzer = benutzername, aktiv = self.benutzer.len(), "Sitzung entfernt");
        }
    }

    /// Gibt true zurueck wenn der Benutzer verbunden ist
    pub fn ist_registriert(&self, benutzername: &str) -> bool {
        self.benutzer.contains_key(benutzername)
    }

    /// Verbindungs-Handle eines Benutzers
    pub fn verbindung(&self, benutzername: &str) -> Option<&Verbindung> {
        self.benutzer.get(benutzername)
    }

    /// Alle verbundenen Benutzernamen
    pub fn benutzernamen(&self) -> impl Iterator<Item = &str> {
        self.benutzer.keys().map(String::as_str)
    }

    /// Serialisiert und sendet einen Umschlag an einen Benutzer.
    ///
    /// Gibt `false` zurueck wenn der Benutzer unbekannt ist oder der
    /// Transport das Frame nicht annimmt.
    pub fn senden(&self, benutzername: &str, umschlag: &Ausgehend) -> bool {
        let Some(verbindung) = self.benutzer.get(benutzername) else {
            return false;
        };
        match umschlag.als_json() {
            Ok(text) => {
                let ok = verbindung.senden(&text);
                if !ok {
                    tracing::debug!(benutzer = benutzername, "Frame nicht zustellbar");
                }
                ok
            }
            Err(e) => {
                tracing::error!(fehler = %e, "Umschlag nicht serialisierbar");
                false
            }
        }
    }

    /// Schliesst die Verbindung eines Benutzers mit Close-Code und Grund
    pub fn schliessen(&self, benutzername: &str, code: u16, grund: &str) {
        if let Some(verbindung) = self.benutzer.get(benutzername) {
            tracing::info!(benutzer = benutzername, code, grund, "Verbindung wird geschlossen");
            verbindung.schliessen(code, grund);
        }
    }

    /// Anzahl der aktiven Sitzungen
    pub fn anzahl(&self) -> usize {
        self.benutzer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use plauderei_core::verbindung::VerbindungsHandle;

    #[derive(Default)]
    struct TestVerbindung {
        frames: Mutex<Vec<String>>,
    }

    impl VerbindungsHandle for TestVerbindung {
        fn senden(&self, text: &str) -> bool {
            self.frames.lock().unwrap().push(text.to_string());
            true
        }

        fn schliessen(&self, _code: u16, _grund: &str) {}
    }

    fn verbindung() -> Verbindung {
        Arc::new(TestVerbindung::default())
    }

    #[test]
    fn registrierung_und_doppelte_namen() {
        let mut sitzungen = SitzungsVerwaltung::neu();
        assert!(sitzungen.registrieren("alice", verbindung()).is_ok());
        assert_eq!(
            sitzungen.registrieren("alice", verbindung()),
            Err(ZugangsFehler::BenutzernameVergeben)
        );
        assert!(sitzungen.ist_registriert("alice"));
        assert_eq!(sitzungen.anzahl(), 1);
    }

    #[test]
    fn leerer_name_abgelehnt() {
        let mut sitzungen = SitzungsVerwaltung::neu();
        assert_eq!(
            sitzungen.registrieren("", verbindung()),
            Err(ZugangsFehler::BenutzernameFehlt)
        );
    }

    #[test]
    fn reservierter_name_case_insensitiv_abgelehnt() {
        let mut sitzungen = SitzungsVerwaltung::neu();
        for name in ["admin", "Admin", "ADMIN"] {
            assert_eq!(
                sitzungen.registrieren(name, verbindung()),
                Err(ZugangsFehler::BenutzernameReserviert),
                "{name} muss abgelehnt werden"
            );
        }
    }

    #[test]
    fn name_nach_entfernen_wieder_frei() {
        let mut sitzungen = SitzungsVerwaltung::neu();
        sitzungen.registrieren("alice", verbindung()).unwrap();
        sitzungen.entfernen("alice");
        assert!(!sitzungen.ist_registriert("alice"));
        assert!(sitzungen.registrieren("alice", verbindung()).is_ok());
    }

    #[test]
    fn senden_an_unbekannten_benutzer_schlaegt_fehl() {
        let sitzungen = SitzungsVerwaltung::neu();
        let umschlag = Ausgehend::fehler("egal");
        assert!(!sitzungen.senden("niemand", &umschlag));
    }
}
