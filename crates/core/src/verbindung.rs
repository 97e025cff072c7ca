//! Verbindungs-Seam zwischen Kern und Transport
//!
//! Der Kern kennt vom Transport nur dieses Trait: Text senden und die
//! Verbindung mit einem Schliesscode beenden. Die konkrete Implementierung
//! (WebSocket-Writer-Task mit Send-Queue) lebt im Server-Crate; Tests
//! verwenden eine Mock-Implementierung die gesendete Frames aufzeichnet.

use std::sync::Arc;

use crate::types::schliess_code;

/// Handle auf eine einzelne Client-Verbindung
///
/// Sende-Fehler (volle Queue, getrennter Client) werden von der
/// Implementierung geloggt und als `false` gemeldet, nie als Panic oder
/// Error propagiert – fehlgeschlagene Sends werden weder wiederholt noch
/// gepuffert.
pub trait VerbindungsHandle: Send + Sync {
    /// Sendet einen bereits serialisierten Text-Frame an den Client.
    ///
    /// Gibt `false` zurueck wenn der Frame nicht eingereiht werden konnte.
    fn senden(&self, text: &str) -> bool;

    /// Schliesst die Verbindung mit Code und Begruendung
    fn schliessen(&self, code: u16, grund: &str);
}

/// Geteiltes Verbindungs-Handle
pub type Verbindung = Arc<dyn VerbindungsHandle>;

/// Schliesst eine Verbindung mit dem Standard-Abnormal-Code
pub fn abnormal_schliessen(verbindung: &Verbindung, grund: &str) {
    verbindung.schliessen(schliess_code::ABNORMAL, grund);
}
