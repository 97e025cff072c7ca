//! Seam zum Voice-Peer-Backend
//!
//! Das Relais spricht Peers nur ueber dieses Trait an. Ein Peer ist eine
//! zustandsbehaftete Verbindungs-Maschine pro (Benutzer, Voice-Kanal);
//! woraus sie besteht (WebRTC-Stack, Test-Double) entscheidet die Fabrik.
//!
//! Reaktionen des Peers (erzeugtes Signal, eingehender Medien-Stream,
//! Verbindungsaufbau, Fehler) kommen nicht als Rueckgabewerte sondern als
//! `PeerEreignis` ueber den Ereignis-Sender zurueck in den Router. Damit
//! laufen auch Peer-Reaktionen durch den einzelnen Dispatch-Task.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use plauderei_core::types::KanalId;

use crate::router::RouterEreignis;

/// Fehler eines Peer-Backends
#[derive(Debug, Error)]
#[error("Peer-Fehler: {0}")]
pub struct PeerFehler(pub String);

/// Ein Medien-Stream eines Voice-Teilnehmers
///
/// Das Relais behandelt Streams als opake Handles; die ID stammt vom
/// Client (`streamId` im Beitritts-Payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedienStream {
    pub id: String,
}

impl MedienStream {
    pub fn neu(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Reaktion eines Peers, adressiert an (Kanal, Benutzer)
#[derive(Debug)]
pub struct PeerEreignis {
    pub kanal_id: KanalId,
    pub benutzername: String,
    pub art: PeerEreignisArt,
}

/// Was der Peer gemeldet hat
#[derive(Debug)]
pub enum PeerEreignisArt {
    /// Der Peer hat ein Signal erzeugt das zum Client muss (`onPeerSignal`)
    Signal(Value),
    /// Die Verbindung steht (`onJoinedVoiceChannel`)
    Verbunden,
    /// Der Peer hat einen Medien-Stream empfangen
    Stream(MedienStream),
    /// Das Backend hat einen Fehler gemeldet
    Fehler(String),
}

/// Eine Peer-Verbindung zu genau einem Voice-Teilnehmer
pub trait VoicePeer: Send {
    /// Fuehrt dem Peer ein Signal des Clients zu (Offer/Answer/Candidate)
    fn signal_zufuehren(&mut self, signal: Value) -> Result<(), PeerFehler>;

    /// Haengt den Stream eines anderen Teilnehmers an diesen Peer an
    fn stream_anhaengen(&mut self, stream: &MedienStream) -> Result<(), PeerFehler>;

    /// Entfernt einen zuvor angehaengten Stream wieder
    fn stream_entfernen(&mut self, stream_id: &str) -> Result<(), PeerFehler>;

    /// Baut die Peer-Verbindung ab (beim Verlassen des Voice-Kanals)
    fn zerstoeren(&mut self) -> Result<(), PeerFehler>;
}

/// Erzeugt Peer-Verbindungen
///
/// Die Fabrik bekommt den Ereignis-Sender des Routers; alle Reaktionen des
/// erzeugten Peers muessen als `RouterEreignis::Peer` dort hineinlaufen.
pub trait PeerFabrik: Send + Sync {
    fn erstellen(
        &self,
        kanal_id: KanalId,
        benutzername: &str,
        ereignisse: mpsc::Sender<RouterEreignis>,
    ) -> Box<dyn VoicePeer>;
}
