//! Medienloses Peer-Backend
//!
//! Der Server vermittelt nur Signale zwischen den Clients; die eigentliche
//! Medienverbindung laeuft Client-zu-Client. Dieser Peer bestaetigt den
//! Verbindungsaufbau nach dem ersten Signal und nimmt Stream-Zuordnungen
//! entgegen ohne selbst Medien zu transportieren.

use serde_json::Value;
use tokio::sync::mpsc;

use plauderei_core::types::KanalId;
use plauderei_signaling::{
    MedienStream, PeerEreignis, PeerEreignisArt, PeerFabrik, PeerFehler, RouterEreignis, VoicePeer,
};

/// Erzeugt medienlose Peers
pub struct OhneMedienFabrik;

impl PeerFabrik for OhneMedienFabrik {
    fn erstellen(
        &self,
        kanal_id: KanalId,
        benutzername: &str,
        ereignisse: mpsc::Sender<RouterEreignis>,
    ) -> Box<dyn VoicePeer> {
        Box::new(OhneMedienPeer {
            kanal_id,
            benutzername: benutzername.to_string(),
            ereignisse,
            verbunden_gemeldet: false,
        })
    }
}

struct OhneMedienPeer {
    kanal_id: KanalId,
    benutzername: String,
    ereignisse: mpsc::Sender<RouterEreignis>,
    verbunden_gemeldet: bool,
}

impl OhneMedienPeer {
    fn melden(&self, art: PeerEreignisArt) {
        let ereignis = RouterEreignis::Peer(PeerEreignis {
            kanal_id: self.kanal_id,
            benutzername: self.benutzername.clone(),
            art,
        });
        if self.ereignisse.try_send(ereignis).is_err() {
            tracing::warn!(
                benutzer = self.benutzername,
                "Router-Queue voll, Peer-Reaktion verworfen"
            );
        }
    }
}

impl VoicePeer for OhneMedienPeer {
    fn signal_zufuehren(&mut self, signal: Value) -> Result<(), PeerFehler> {
        tracing::debug!(
            benutzer = self.benutzername,
            kanal = %self.kanal_id,
            signal_typ = signal["type"].as_str().unwrap_or("unbekannt"),
            "Signal entgegengenommen"
        );
        if !self.verbunden_gemeldet {
            self.verbunden_gemeldet = true;
            self.melden(PeerEreignisArt::Verbunden);
        }
        Ok(())
    }

    fn stream_anhaengen(&mut self, stream: &MedienStream) -> Result<(), PeerFehler> {
        tracing::debug!(benutzer = self.benutzername, stream = stream.id, "Stream zugeordnet");
        Ok(())
    }

    fn stream_entfernen(&mut self, stream_id: &str) -> Result<(), PeerFehler> {
        tracing::debug!(benutzer = self.benutzername, stream = stream_id, "Stream-Zuordnung entfernt");
        Ok(())
    }

    fn zerstoeren(&mut self) -> Result<(), PeerFehler> {
        tracing::debug!(benutzer = self.benutzername, kanal = %self.kanal_id, "Peer abgebaut");
        Ok(())
    }
}
