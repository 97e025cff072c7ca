//! Benutzereinstellungen
//!
//! Aktuell gibt es genau eine Einstellung: Join/Leave-Hinweise
//! stummschalten. Eintraege ueberleben Kanalwechsel und Verbindungsabbau
//! und werden erst beim Prozessneustart geleert (Referenzverhalten, siehe
//! DESIGN.md zur Lebensdauer-Entscheidung).

use std::collections::HashMap;

/// Einstellungen eines einzelnen Benutzers
#[derive(Debug, Clone, Copy, Default)]
pub struct BenutzerPraeferenz {
    /// Join/Leave-Hinweise nicht zustellen
    pub ignoriert_updates: bool,
}

/// Praeferenzen aller bekannten Benutzer, indiziert nach Benutzername
#[derive(Debug, Default)]
pub struct PraeferenzStore {
    eintraege: HashMap<String, BenutzerPraeferenz>,
}

impl PraeferenzStore {
    /// Erstellt einen leeren Store
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt die Stummschaltung der Join/Leave-Hinweise fuer einen Benutzer
    pub fn updates_stummschalten(&mut self, benutzername: &str, stumm: bool) {
        self.eintraege
            .entry(benutzername.to_string())
            .or_default()
            .ignoriert_updates = stumm;
    }

    /// Gibt true zurueck wenn der Benutzer Join/Leave-Hinweise ignoriert
    pub fn ignoriert_updates(&self, benutzername: &str) -> bool {
        self.eintraege
            .get(benutzername)
            .map(|p| p.ignoriert_updates)
            .unwrap_or(false)
    }

    /// Anzahl der bekannten Eintraege
    pub fn anzahl(&self) -> usize {
        self.eintraege.len()
    }
}
