//! plauderei-signaling – Session-Verwaltung und Ereignis-Routing
//!
//! Dieses Crate implementiert:
//! - SitzungsVerwaltung: Registry der verbundenen Benutzer
//! - EreignisRouter: der einzelne Dispatch-Task der allen Zustand besitzt
//! - VoiceRelais: Signal-Weiterleitung und Stream-Fan-out pro Voice-Sitzung
//! - Seams fuer die externen Kollaborateure: `PasswortHasher` und
//!   `PeerFabrik`/`VoicePeer`
//!
//! Der Transport liefert seine Lebenszyklus-Ereignisse (open/event/close/
//! transport-error) als `RouterEreignis` ueber eine mpsc-Queue an; der
//! Router verarbeitet genau ein Ereignis vollstaendig bevor das naechste
//! drankommt. Damit ist jede Mutation der geteilten Maps serialisiert und
//! das Crate kommt ohne Locks aus.

pub mod error;
pub mod hasher;
pub mod peer;
pub mod router;
pub mod sitzung;
pub mod voice;

#[cfg(test)]
mod tests;

pub use error::ZugangsFehler;
pub use hasher::{HashFehler, PasswortHasher};
pub use peer::{MedienStream, PeerEreignis, PeerEreignisArt, PeerFabrik, PeerFehler, VoicePeer};
pub use router::{EreignisRouter, RouterDienst, RouterEreignis};
pub use sitzung::SitzungsVerwaltung;
pub use voice::VoiceRelais;
