//! plauderei-chat – Kanal- und Nachrichtenverwaltung
//!
//! Dieses Crate implementiert:
//! - BegrenzterVerlauf: Ringpuffer fuer den Nachrichtenverlauf pro Kanal
//! - KanalStore: Kanal-Entitaeten, Mitgliedschaft, Anlegen/Aufraeumen
//! - PraeferenzStore: Benutzereinstellungen (Join/Leave-Hinweise stumm)
//! - SpamWache: Zaehler fuer wiederholte Beitrittsversuche
//! - Kommandos: Registry der Admin-Textkommandos
//!
//! Alle Typen sind fuer den Betrieb in einem einzelnen Dispatch-Task
//! ausgelegt; es gibt bewusst keine internen Locks.

pub mod error;
pub mod kanal;
pub mod kommandos;
pub mod praeferenzen;
pub mod spam;
pub mod verlauf;

pub use error::KanalFehler;
pub use kanal::{Kanal, KanalStore};
pub use kommandos::{KommandoErgebnis, KommandoKontext, KommandoWirkung, Kommandos};
pub use praeferenzen::PraeferenzStore;
pub use spam::{SpamWache, SPAM_GRUND};
pub use verlauf::BegrenzterVerlauf;
