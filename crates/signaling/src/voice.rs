//! Voice-Relais: Signal-Weiterleitung und Stream-Fan-out
//!
//! Pro (Kanal, Benutzer) existiert hoechstens eine Voice-Sitzung mit einem
//! Peer aus der Fabrik. Das Relais reagiert auf zwei Seiten:
//! - Client-Seite: `onJoinVocalChannel`/`onLeaveVocalChannel` vom Router
//! - Peer-Seite: `PeerEreignis`-Reaktionen, die der Router als
//!   `RouterEreignis::Peer` wieder einspeist
//!
//! Fan-out-Invariante: jeder Stream wird an jeden anderen Teilnehmer genau
//! einmal angehaengt. Ein neuer Stream geht an alle bereits verbundenen
//! Sitzungen; ein neu Verbundener bekommt alle bereits vorhandenen Streams.
//! Da beide Wege durch denselben Dispatch-Task laufen, kann sich kein
//! Doppel-Anhaengen einschleichen.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;

use plauderei_core::types::KanalId;
use plauderei_protocol::{Ausgehend, EreignisTyp, VoiceBeitrittDaten};

use crate::peer::{MedienStream, PeerEreignis, PeerEreignisArt, PeerFabrik, VoicePeer};
use crate::router::RouterEreignis;
use crate::sitzung::SitzungsVerwaltung;

/// Lebensphase einer Voice-Sitzung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceZustand {
    /// Peer erstellt, Handshake laeuft
    Signalisiert,
    /// Peer-Verbindung steht, noch kein eigener Stream
    Verbunden,
    /// Peer-Verbindung steht und eigener Stream liegt vor
    Streamt,
}

impl VoiceZustand {
    /// Sitzungen in diesen Phasen duerfen fremde Streams angehaengt bekommen
    fn empfangsbereit(&self) -> bool {
        matches!(self, Self::Verbunden | Self::Streamt)
    }
}

/// Voice-Sitzung eines Benutzers in einem Kanal
struct VoiceSitzung {
    /// Vom Client beim Beitritt gemeldete Stream-ID (fuer die Selbst-Filterung)
    stream_id: Option<String>,
    /// Der eigene Stream, sobald der Peer ihn gemeldet hat
    stream: Option<MedienStream>,
    zustand: VoiceZustand,
    peer: Box<dyn VoicePeer>,
}

/// Besitzt alle Voice-Sitzungen, gruppiert nach Kanal
pub struct VoiceRelais {
    sitzungen: HashMap<KanalId, HashMap<String, VoiceSitzung>>,
    fabrik: Box<dyn PeerFabrik>,
    ereignisse: mpsc::Sender<RouterEreignis>,
}

impl VoiceRelais {
    pub fn neu(fabrik: Box<dyn PeerFabrik>, ereignisse: mpsc::Sender<RouterEreignis>) -> Self {
        Self {
            sitzungen: HashMap::new(),
            fabrik,
            ereignisse,
        }
    }

    /// Verarbeitet `onJoinVocalChannel`.
    ///
    /// Beim ersten Beitritt wird ein Peer erstellt und das mitgelieferte
    /// Signal zugefuehrt; Folge-Frames desselben Benutzers fuehren nur noch
    /// ihr Signal zu (laufender Handshake).
    pub fn beitreten(&mut self, benutzername: &str, kanal_id: KanalId, daten: VoiceBeitrittDaten) {
        let kanal_sitzungen = self.sitzungen.entry(kanal_id).or_default();

        if let Some(sitzung) = kanal_sitzungen.get_mut(benutzername) {
            if daten.stream_id.is_some() {
                sitzung.stream_id = daten.stream_id;
            }
            if let Some(signal) = daten.signal {
                signal_zufuehren(&mut *sitzung.peer, benutzername, signal);
            }
            return;
        }

        tracing::info!(benutzer = benutzername, kanal = %kanal_id, "Voice-Sitzung erstellt");
        let mut peer = self
            .fabrik
            .erstellen(kanal_id, benutzername, self.ereignisse.clone());
        if let Some(signal) = daten.signal.clone() {
            signal_zufuehren(&mut *peer, benutzername, signal);
        }
        kanal_sitzungen.insert(
            benutzername.to_string(),
            VoiceSitzung {
                stream_id: daten.stream_id,
                stream: None,
                zustand: VoiceZustand::Signalisiert,
                peer,
            },
        );
    }

    /// Verarbeitet `onLeaveVocalChannel`.
    ///
    /// Der eigene Stream wird bei allen verbleibenden Teilnehmern genau
    /// einmal entfernt, danach wird der Peer abgebaut. Ohne Sitzung ist der
    /// Aufruf ein No-op.
    pub fn verlassen(&mut self, benutzername: &str, kanal_id: KanalId) {
        let Some(kanal_sitzungen) = self.sitzungen.get_mut(&kanal_id) else {
            return;
        };
        let Some(mut sitzung) = kanal_sitzungen.remove(benutzername) else {
            return;
        };

        if let Some(stream) = &sitzung.stream {
            for (anderer, andere_sitzung) in kanal_sitzungen.iter_mut() {
                if let Err(e) = andere_sitzung.peer.stream_entfernen(&stream.id) {
                    tracing::warn!(benutzer = anderer, fehler = %e, "Stream-Entfernen fehlgeschlagen");
                }
            }
        }
        if let Err(e) = sitzung.peer.zerstoeren() {
            tracing::warn!(benutzer = benutzername, fehler = %e, "Peer-Abbau fehlgeschlagen");
        }
        tracing::info!(benutzer = benutzername, kanal = %kanal_id, "Voice-Sitzung beendet");

        if kanal_sitzungen.is_empty() {
            self.sitzungen.remove(&kanal_id);
        }
    }

    /// Beendet alle Voice-Sitzungen eines Kanals (Kanal wurde geloescht).
    ///
    /// Streams muessen nicht einzeln entkoppelt werden: jeder Peer des
    /// Kanals wird ohnehin abgebaut.
    pub fn kanal_schliessen(&mut self, kanal_id: &KanalId) {
        let Some(kanal_sitzungen) = self.sitzungen.remove(kanal_id) else {
            return;
        };
        for (benutzername, mut sitzung) in kanal_sitzungen {
            if let Err(e) = sitzung.peer.zerstoeren() {
                tracing::warn!(benutzer = benutzername, fehler = %e, "Peer-Abbau fehlgeschlagen");
            }
        }
        tracing::info!(kanal = %kanal_id, "Voice-Sitzungen des Kanals beendet");
    }

    /// Beendet alle Voice-Sitzungen eines Benutzers (Verbindungsabbau)
    pub fn alle_verlassen(&mut self, benutzername: &str) {
        let betroffen: Vec<KanalId> = self
            .sitzungen
            .iter()
            .filter(|(_, kanal)| kanal.contains_key(benutzername))
            .map(|(id, _)| *id)
            .collect();
        for kanal_id in betroffen {
            self.verlassen(benutzername, kanal_id);
        }
    }

    /// Verarbeitet eine Peer-Reaktion
    pub fn peer_ereignis(&mut self, ereignis: PeerEreignis, sitzungen: &SitzungsVerwaltung) {
        let PeerEreignis {
            kanal_id,
            benutzername,
            art,
        } = ereignis;

        match art {
            PeerEreignisArt::Signal(signal) => {
                let umschlag =
                    Ausgehend::vom_admin(EreignisTyp::OnPeerSignal, Some(kanal_id), signal);
                sitzungen.senden(&benutzername, &umschlag);
            }
            PeerEreignisArt::Verbunden => {
                self.verbunden(&benutzername, kanal_id, sitzungen);
            }
            PeerEreignisArt::Stream(stream) => {
                self.stream_empfangen(&benutzername, kanal_id, stream);
            }
            PeerEreignisArt::Fehler(text) => {
                tracing::warn!(benutzer = benutzername, kanal = %kanal_id, fehler = text, "Peer meldet Fehler");
            }
        }
    }

    /// Peer-Verbindung steht: Bestaetigung an den Client, dann alle bereits
    /// vorhandenen fremden Streams anhaengen.
    fn verbunden(&mut self, benutzername: &str, kanal_id: KanalId, sitzungen: &SitzungsVerwaltung) {
        let Some(kanal_sitzungen) = self.sitzungen.get_mut(&kanal_id) else {
            return;
        };

        let eigene_stream_id = match kanal_sitzungen.get(benutzername) {
            Some(sitzung) => sitzung.stream_id.clone(),
            // Sitzung zwischenzeitlich beendet, verspaetete Peer-Reaktion
            None => return,
        };

        let vorhandene: Vec<MedienStream> = kanal_sitzungen
            .iter()
            .filter(|(name, _)| name.as_str() != benutzername)
            .filter_map(|(_, s)| s.stream.clone())
            .filter(|stream| eigene_stream_id.as_deref() != Some(stream.id.as_str()))
            .collect();

        let Some(sitzung) = kanal_sitzungen.get_mut(benutzername) else {
            return;
        };
        sitzung.zustand = VoiceZustand::Verbunden;

        let umschlag =
            Ausgehend::vom_admin(EreignisTyp::OnJoinedVoiceChannel, Some(kanal_id), Value::Null);
        sitzungen.senden(benutzername, &umschlag);
        tracing::info!(benutzer = benutzername, kanal = %kanal_id, "Voice-Verbindung steht");

        for stream in vorhandene {
            if let Err(e) = sitzung.peer.stream_anhaengen(&stream) {
                tracing::warn!(benutzer = benutzername, stream = stream.id, fehler = %e, "Stream-Anhaengen fehlgeschlagen");
            }
        }
    }

    /// Eigener Stream liegt vor: merken und an alle empfangsbereiten
    /// anderen Teilnehmer verteilen.
    fn stream_empfangen(&mut self, benutzername: &str, kanal_id: KanalId, stream: MedienStream) {
        let Some(kanal_sitzungen) = self.sitzungen.get_mut(&kanal_id) else {
            return;
        };

        match kanal_sitzungen.get_mut(benutzername) {
            Some(sitzung) => {
                sitzung.stream = Some(stream.clone());
                sitzung.zustand = VoiceZustand::Streamt;
            }
            None => return,
        }
        tracing::debug!(benutzer = benutzername, kanal = %kanal_id, stream = stream.id, "Stream empfangen");

        for (anderer, sitzung) in kanal_sitzungen.iter_mut() {
            if anderer == benutzername || !sitzung.zustand.empfangsbereit() {
                continue;
            }
            if let Err(e) = sitzung.peer.stream_anhaengen(&stream) {
                tracing::warn!(benutzer = anderer, stream = stream.id, fehler = %e, "Stream-Anhaengen fehlgeschlagen");
            }
        }
    }

    /// Gibt true zurueck wenn der Benutzer eine Voice-Sitzung im Kanal hat
    pub fn ist_teilnehmer(&self, kanal_id: &KanalId, benutzername: &str) -> bool {
        self.sitzungen
            .get(kanal_id)
            .is_some_and(|kanal| kanal.contains_key(benutzername))
    }

    /// Anzahl der Voice-Teilnehmer eines Kanals
    pub fn anzahl_teilnehmer(&self, kanal_id: &KanalId) -> usize {
        self.sitzungen.get(kanal_id).map_or(0, HashMap::len)
    }
}

fn signal_zufuehren(peer: &mut dyn VoicePeer, benutzername: &str, signal: Value) {
    if let Err(e) = peer.signal_zufuehren(signal) {
        tracing::warn!(benutzer = benutzername, fehler = %e, "Signal-Zufuehren fehlgeschlagen");
    }
}
