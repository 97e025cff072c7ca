//! Fehlertypen fuer das Chat-Crate
//!
//! Die Display-Texte sind die Klartexte die als `onError`-Nachricht an den
//! Client gehen – Fehlercodes gibt es auf dem Draht nicht.

use thiserror::Error;

/// Validierungsfehler der Kanal-Operationen
///
/// Alle Varianten sind fuer den Absender bestimmt; keine davon beendet die
/// Verbindung oder veraendert Zustand.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KanalFehler {
    #[error("The channel with id {0} does not exist")]
    KanalNichtGefunden(String),

    #[error("Please provide a channel name")]
    NameFehlt,

    #[error("The channel name must be between 5 and 20 characters long")]
    NameLaengeUngueltig,

    #[error("A channel named {0} already exists")]
    NameVergeben(String),

    #[error("This channel is password protected, please provide a password")]
    PasswortErforderlich,

    #[error("Wrong password")]
    PasswortFalsch,

    #[error("The channel {0} cannot be left")]
    StandardKanalNichtVerlassbar(String),

    #[error("Please provide a message")]
    NachrichtLeer,
}
