//! plauderei-core – Gemeinsame Typen und Traits
//!
//! Enthaelt die ID-Newtypes, die WebSocket-Schliesscodes und das
//! `VerbindungsHandle`-Trait, ueber das der Kern mit dem Transport spricht.

pub mod types;
pub mod verbindung;

pub use types::{schliess_code, KanalId, ABSENDER_ADMIN, RESERVIERTER_NAME};
pub use verbindung::VerbindungsHandle;
