//! plauderei-protocol – Wire-Protokoll des Chatdienstes
//!
//! Definiert die JSON-Umschlaege die ueber die WebSocket-Verbindung laufen:
//! eingehend `{eventType, channelId, data}`, ausgehend zusaetzlich mit
//! `sender` und `timestamp`. Die Feldnamen sind Teil des Protokolls und
//! duerfen nicht umbenannt werden.

pub mod ereignis;

pub use ereignis::{
    Ausgehend, Eingehend, EreignisTyp, KanalAnlegenDaten, KanalAuszug, KanalBeitrittDaten,
    KanalBeschreibung, Nachricht, VoiceBeitrittDaten,
};
