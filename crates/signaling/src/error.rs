//! Fehlertypen fuer das Signaling-Crate

use thiserror::Error;

/// Zulassungsfehler beim Verbindungsaufbau
///
/// Jede Variante ist fatal fuer die Verbindung: der Client erhaelt eine
/// `onError`-Nachricht mit dem Display-Text und danach einen Close-Frame
/// mit Code 1008.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZugangsFehler {
    #[error("Please provide a username in the request's query parameters")]
    BenutzernameFehlt,

    #[error("Username already in use! Please reconnect using a different username")]
    BenutzernameVergeben,

    #[error("This username is reserved, please reconnect using a different username")]
    BenutzernameReserviert,
}
