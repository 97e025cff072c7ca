//! Seam fuer das Passwort-Hashing
//!
//! Das Hashing-Primitiv ist ein externer Kollaborateur: der Router kennt
//! nur dieses Trait. Die Signaturen sind synchron; der Router fuehrt sie
//! auf dem Blocking-Pool aus und bekommt das Ergebnis als internes
//! Ereignis zurueck, damit der Dispatch-Task nie blockiert.
//!
//! Die Produktions-Implementierung (Argon2id) lebt im Server-Crate.

use thiserror::Error;

/// Fehler des Hashing-Primitivs
#[derive(Debug, Error)]
#[error("Passwort-Hashing fehlgeschlagen: {0}")]
pub struct HashFehler(pub String);

/// Hasht und verifiziert Kanal-Passwoerter
pub trait PasswortHasher: Send + Sync {
    /// Hasht ein Klartext-Passwort (inkl. Salt) zu einem Speicherformat
    fn hashen(&self, klartext: &str) -> Result<String, HashFehler>;

    /// Verifiziert ein Klartext-Passwort gegen einen gespeicherten Hash.
    ///
    /// Gibt `Ok(false)` bei falschem Passwort zurueck; `Err` nur wenn das
    /// Primitiv selbst scheitert (kaputtes Hash-Format etc.).
    fn verifizieren(&self, klartext: &str, hash: &str) -> Result<bool, HashFehler>;
}
