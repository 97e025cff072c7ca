//! Integrationstests fuer Router und Voice-Relais
//!
//! Die Tests treiben `EreignisRouter::verarbeiten` direkt und lesen die
//! Frames aus aufzeichnenden Verbindungs-Doubles. Hash-Jobs laufen echt
//! auf dem Blocking-Pool; `hash_abwarten` holt das Ergebnis aus der Queue
//! und speist es wieder ein, genau wie der Dienst es taete.


use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use plauderei_chat::KanalStore;
use plauderei_core::types::KanalId;
use plauderei_core::verbindung::VerbindungsHandle;

use crate::hasher::{HashFehler, PasswortHasher};
use crate::peer::{MedienStream, PeerFabrik, PeerFehler, VoicePeer};
use crate::router::{EreignisRouter, RouterEreignis};

// ---------------------------------------------------------------------------
// Verbindungs-Double
// ---------------------------------------------------------------------------

/// Zeichnet gesendete Frames und den Close-Aufruf auf
#[derive(Default)]
pub(crate) struct MockVerbindung {
    frames: Mutex<Vec<String>>,
    geschlossen: Mutex<Option<(u16, String)>>,
}

impl MockVerbindung {
    pub(crate) fn neu() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn anzahl_frames(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    /// Alle Frames als JSON-Werte
    pub(crate) fn frames(&self) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|roh| serde_json::from_str(roh).expect("Frame muss JSON sein"))
            .collect()
    }

    /// Frames eines bestimmten `eventType`
    pub(crate) fn vom_typ(&self, typ: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|f| f["eventType"] == typ)
            .collect()
    }

    /// Die data-Strings aller `onError`-Frames
    pub(crate) fn fehler_texte(&self) -> Vec<String> {
        self.vom_typ("onError")
            .into_iter()
            .filter_map(|f| f["data"].as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn geschlossen(&self) -> Option<(u16, String)> {
        self.geschlossen.lock().unwrap().clone()
    }
}

impl VerbindungsHandle for MockVerbindung {
    fn senden(&self, text: &str) -> bool {
        self.frames.lock().unwrap().push(text.to_string());
        true
    }

    fn schliessen(&self, code: u16, grund: &str) {
        *self.geschlossen.lock().unwrap() = Some((code, grund.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Hasher-Double
// ---------------------------------------------------------------------------

/// Hasht nichts: praefigiert den Klartext, vergleichbar und lesbar
pub(crate) struct KlartextHasher;

impl PasswortHasher for KlartextHasher {
    fn hashen(&self, klartext: &str) -> Result<String, HashFehler> {
        Ok(format!("klar:{klartext}"))
    }

    fn verifizieren(&self, klartext: &str, hash: &str) -> Result<bool, HashFehler> {
        Ok(hash == format!("klar:{klartext}"))
    }
}

// ---------------------------------------------------------------------------
// Peer-Double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PeerAktion {
    Signal(Value),
    Angehaengt(String),
    Entfernt(String),
    Zerstoert,
}

type Journal = Arc<Mutex<Vec<PeerAktion>>>;

/// Protokolliert alle von der Fabrik erstellten Peers
#[derive(Default)]
pub(crate) struct FabrikProtokoll {
    journale: Mutex<HashMap<(KanalId, String), Journal>>,
    erstellt: AtomicUsize,
}

impl FabrikProtokoll {
    /// Aktionen des Peers von (Kanal, Benutzer); leer wenn nie erstellt
    pub(crate) fn aktionen(&self, kanal_id: KanalId, benutzername: &str) -> Vec<PeerAktion> {
        self.journale
            .lock()
            .unwrap()
            .get(&(kanal_id, benutzername.to_string()))
            .map(|j| j.lock().unwrap().clone())
            .unwrap_or_default()
    }

    /// Wie oft ein Stream mit dieser ID an den Peer angehaengt wurde
    pub(crate) fn angehaengt(&self, kanal_id: KanalId, benutzername: &str, stream_id: &str) -> usize {
        self.aktionen(kanal_id, benutzername)
            .iter()
            .filter(|a| **a == PeerAktion::Angehaengt(stream_id.to_string()))
            .count()
    }

    pub(crate) fn anzahl_erstellt(&self) -> usize {
        self.erstellt.load(Ordering::SeqCst)
    }
}

struct MockPeer {
    journal: Journal,
}

impl VoicePeer for MockPeer {
    fn signal_zufuehren(&mut self, signal: Value) -> Result<(), PeerFehler> {
        self.journal.lock().unwrap().push(PeerAktion::Signal(signal));
        Ok(())
    }

    fn stream_anhaengen(&mut self, stream: &MedienStream) -> Result<(), PeerFehler> {
        self.journal
            .lock()
            .unwrap()
            .push(PeerAktion::Angehaengt(stream.id.clone()));
        Ok(())
    }

    fn stream_entfernen(&mut self, stream_id: &str) -> Result<(), PeerFehler> {
        self.journal
            .lock()
            .unwrap()
            .push(PeerAktion::Entfernt(stream_id.to_string()));
        Ok(())
    }

    fn zerstoeren(&mut self) -> Result<(), PeerFehler> {
        self.journal.lock().unwrap().push(PeerAktion::Zerstoert);
        Ok(())
    }
}

pub(crate) struct MockPeerFabrik {
    protokoll: Arc<FabrikProtokoll>,
}

impl PeerFabrik for MockPeerFabrik {
    fn erstellen(
        &self,
        kanal_id: KanalId,
        benutzername: &str,
        _ereignisse: mpsc::Sender<RouterEreignis>,
    ) -> Box<dyn VoicePeer> {
        let journal: Journal = Arc::default();
        self.protokoll
            .journale
            .lock()
            .unwrap()
            .insert((kanal_id, benutzername.to_string()), journal.clone());
        self.protokoll.erstellt.fetch_add(1, Ordering::SeqCst);
        Box::new(MockPeer { journal })
    }
}

// ---------------------------------------------------------------------------
// Testumgebung
// ---------------------------------------------------------------------------

/// Router samt gesaeten Standard-Kanaelen und den Double-Protokollen
pub(crate) struct Umgebung {
    pub(crate) router: EreignisRouter,
    hash_ergebnisse: mpsc::Receiver<RouterEreignis>,
    pub(crate) peers: Arc<FabrikProtokoll>,
    pub(crate) general: KanalId,
    pub(crate) team1: KanalId,
    /// Zuletzt verbundenes Handle pro Benutzername (fuer `trennen`)
    verbindungen: HashMap<String, Arc<MockVerbindung>>,
}

impl Umgebung {
    pub(crate) fn neu() -> Self {
        let mut kanaele = KanalStore::neu();
        let general = kanaele.standard_kanal_saeen("Général", true);
        let team1 = kanaele.standard_kanal_saeen("Équipe 1", false);
        kanaele.standard_kanal_saeen("Équipe 2", false);

        let peers = Arc::new(FabrikProtokoll::default());
        let fabrik = MockPeerFabrik {
            protokoll: peers.clone(),
        };

        let (sender, hash_ergebnisse) = mpsc::channel(64);
        let router = EreignisRouter::neu(kanaele, Arc::new(KlartextHasher), Box::new(fabrik), sender);

        Self {
            router,
            hash_ergebnisse,
            peers,
            general,
            team1,
            verbindungen: HashMap::new(),
        }
    }

    /// Verbindet einen Benutzer und gibt sein Verbindungs-Double zurueck
    pub(crate) fn verbinden(&mut self, benutzername: &str) -> Arc<MockVerbindung> {
        let verbindung = MockVerbindung::neu();
        self.verbindungen
            .insert(benutzername.to_string(), verbindung.clone());
        self.router.verarbeiten(RouterEreignis::Verbunden {
            benutzername: benutzername.to_string(),
            verbindung: verbindung.clone(),
        });
        verbindung
    }

    /// Speist ein rohes Text-Frame eines Benutzers ein
    pub(crate) fn senden(&mut self, benutzername: &str, roh: String) {
        self.router.verarbeiten(RouterEreignis::Eingehend {
            benutzername: benutzername.to_string(),
            roh,
        });
    }

    /// Meldet den Close des zuletzt fuer diesen Namen verbundenen Sockets,
    /// genau wie der Transport es taete
    pub(crate) fn trennen(&mut self, benutzername: &str) {
        let verbindung = self
            .verbindungen
            .get(benutzername)
            .expect("Benutzer wurde nie verbunden")
            .clone();
        self.router.verarbeiten(RouterEreignis::Getrennt {
            benutzername: benutzername.to_string(),
            verbindung,
        });
    }

    /// Wartet auf das naechste Hash-Ergebnis und speist es ein
    pub(crate) async fn hash_abwarten(&mut self) {
        let ereignis = self
            .hash_ergebnisse
            .recv()
            .await
            .expect("Hash-Ergebnis erwartet");
        self.router.verarbeiten(ereignis);
    }
}

/// Liest die ID eines Kanals aus dem juengsten `updateChannelsList`-Frame
pub(crate) fn kanal_id_aus_liste(verbindung: &MockVerbindung, name: &str) -> String {
    let liste = verbindung
        .vom_typ("updateChannelsList")
        .pop()
        .expect("Kanal-Liste erwartet");
    liste["data"]
        .as_array()
        .expect("Liste muss ein Array sein")
        .iter()
        .find(|eintrag| eintrag["name"] == name)
        .unwrap_or_else(|| panic!("Kanal {name} fehlt in der Liste"))["id"]
        .as_str()
        .expect("Kanal-ID muss ein String sein")
        .to_string()
}

/// Baut ein Client-Frame im Wire-Format
pub(crate) fn frame(event_type: &str, kanal_id: Option<&str>, data: Value) -> String {
    let mut obj = serde_json::json!({ "eventType": event_type });
    if let Some(id) = kanal_id {
        obj["channelId"] = Value::String(id.to_string());
    }
    if !data.is_null() {
        obj["data"] = data;
    }
    obj.to_string()
}
