//! Der Ereignis-Router: ein Task besitzt den ganzen Zustand
//!
//! ## Design
//! - Saemtliche Transport-Callbacks, Peer-Reaktionen und Hash-Ergebnisse
//!   laufen als `RouterEreignis` durch eine mpsc-Queue in `verarbeiten`;
//!   jedes Ereignis wird vollstaendig abgearbeitet bevor das naechste
//!   drankommt. Keine Locks, keine verschraenkten Mutationen.
//! - Passwort-Hashing blockiert den Dispatch nie: der Job laeuft auf dem
//!   Blocking-Pool und speist sein Ergebnis als `HashFertig` wieder ein.
//!   Zwischen Start und Abschluss koennen andere Ereignisse laufen, daher
//!   pruefen die Abschluss-Handler ihre Vorbedingungen erneut.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use plauderei_chat::{
    KanalFehler, KanalStore, KommandoKontext, KommandoWirkung, Kommandos, PraeferenzStore,
    SpamWache, SPAM_GRUND,
};
use plauderei_core::types::{schliess_code, KanalId};
use plauderei_core::verbindung::Verbindung;
use plauderei_protocol::{
    Ausgehend, Eingehend, EreignisTyp, KanalAnlegenDaten, KanalBeitrittDaten, VoiceBeitrittDaten,
};

use crate::hasher::{HashFehler, PasswortHasher};
use crate::peer::{PeerEreignis, PeerFabrik};
use crate::sitzung::SitzungsVerwaltung;
use crate::voice::VoiceRelais;

/// Groesse der Router-Queue (Ereignisse, nicht Bytes)
const EREIGNIS_PUFFER: usize = 256;

/// Antwort bei Hasher-Ausfaellen; verraet dem Client keine Interna
const INTERNER_FEHLER: &str = "Internal server error";

// ---------------------------------------------------------------------------
// Ereignisse
// ---------------------------------------------------------------------------

/// Alles was den Router erreichen kann
pub enum RouterEreignis {
    /// Der Transport hat eine Verbindung angenommen
    Verbunden {
        benutzername: String,
        verbindung: Verbindung,
    },
    /// Ein rohes Text-Frame eines verbundenen Benutzers
    Eingehend { benutzername: String, roh: String },
    /// Die Verbindung ist weg (regulaerer Close). Das Handle identifiziert
    /// welche Verbindung geschlossen wurde: auch abgewiesene Verbindungen
    /// melden ihren Close unter demselben Benutzernamen.
    Getrennt {
        benutzername: String,
        verbindung: Verbindung,
    },
    /// Die Verbindung ist mit einem Transportfehler gestorben
    TransportFehler {
        benutzername: String,
        verbindung: Verbindung,
        fehler: String,
    },
    /// Ein Hashing-Job vom Blocking-Pool ist fertig
    HashFertig(HashFolge),
    /// Reaktion eines Voice-Peers
    Peer(PeerEreignis),
}

/// Ergebnis eines Hashing-Jobs samt dem Kontext zum Fortsetzen
pub enum HashFolge {
    /// Hash fuer einen passwortgeschuetzten neuen Kanal liegt vor
    KanalAnlegen {
        ersteller: String,
        name: String,
        hash: Result<String, HashFehler>,
    },
    /// Passwort-Verifikation fuer einen Kanal-Beitritt liegt vor
    BeitrittAbschliessen {
        benutzername: String,
        kanal_id: KanalId,
        korrekt: Result<bool, HashFehler>,
    },
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Besitzt Sitzungen, Kanaele, Praeferenzen, Spam-Zaehler und Voice-Relais
pub struct EreignisRouter {
    sitzungen: SitzungsVerwaltung,
    kanaele: KanalStore,
    praeferenzen: PraeferenzStore,
    spam: SpamWache,
    kommandos: Kommandos,
    voice: VoiceRelais,
    hasher: Arc<dyn PasswortHasher>,
    /// Sender der eigenen Queue, fuer Hash-Jobs und Peer-Fabrik
    intern: mpsc::Sender<RouterEreignis>,
}

impl EreignisRouter {
    pub fn neu(
        kanaele: KanalStore,
        hasher: Arc<dyn PasswortHasher>,
        fabrik: Box<dyn PeerFabrik>,
        intern: mpsc::Sender<RouterEreignis>,
    ) -> Self {
        Self {
            sitzungen: SitzungsVerwaltung::neu(),
            kanaele,
            praeferenzen: PraeferenzStore::neu(),
            spam: SpamWache::neu(),
            kommandos: Kommandos::neu(),
            voice: VoiceRelais::neu(fabrik, intern.clone()),
            hasher,
            intern,
        }
    }

    /// Verarbeitet genau ein Ereignis, vollstaendig und synchron
    pub fn verarbeiten(&mut self, ereignis: RouterEreignis) {
        match ereignis {
            RouterEreignis::Verbunden {
                benutzername,
                verbindung,
            } => self.verbinden(&benutzername, verbindung),
            RouterEreignis::Eingehend { benutzername, roh } => {
                self.eingehend(&benutzername, &roh)
            }
            RouterEreignis::Getrennt {
                benutzername,
                verbindung,
            } => self.trennen(&benutzername, &verbindung),
            RouterEreignis::TransportFehler {
                benutzername,
                verbindung,
                fehler,
            } => {
                tracing::warn!(benutzer = benutzername, fehler, "Transportfehler");
                self.trennen(&benutzername, &verbindung);
            }
            RouterEreignis::HashFertig(folge) => self.hash_fertig(folge),
            RouterEreignis::Peer(peer_ereignis) => {
                self.voice.peer_ereignis(peer_ereignis, &self.sitzungen)
            }
        }
    }

    // -- Verbindungs-Lebenszyklus -------------------------------------------

    /// Zulassung, Begruessung und Auto-Beitritte fuer eine neue Verbindung
    fn verbinden(&mut self, benutzername: &str, verbindung: Verbindung) {
        if let Err(fehler) = self.sitzungen.registrieren(benutzername, verbindung.clone()) {
            tracing::info!(benutzer = benutzername, fehler = %fehler, "Zulassung verweigert");
            let umschlag = Ausgehend::fehler(fehler.to_string());
            if let Ok(text) = umschlag.als_json() {
                verbindung.senden(&text);
            }
            verbindung.schliessen(schliess_code::RICHTLINIEN_VERSTOSS, &fehler.to_string());
            return;
        }

        // Erster Schnappschuss der Kanal-Liste, noch vor den Auto-Beitritten
        self.kanal_liste_senden(benutzername);

        // Willkommensnachricht in den ersten Standard-Kanal, landet nicht
        // im Verlauf
        if let Some(ziel) = self.kanaele.erster_standard_kanal() {
            let umschlag = Ausgehend::vom_admin(
                EreignisTyp::OnMessage,
                Some(ziel),
                Value::String(self.kommandos.willkommen().to_string()),
            );
            self.sitzungen.senden(benutzername, &umschlag);
        }

        for kanal_id in self.kanaele.auto_beitritt_kanaele() {
            self.kanaele.mitglied_aufnehmen(
                &kanal_id,
                benutzername,
                verbindung.clone(),
                &self.praeferenzen,
            );
        }

        // Alle sehen die neuen Mitgliederzahlen, der Neue seinen joinStatus
        self.kanal_liste_an_alle();
    }

    /// Baut alles ab was zu einem Benutzer gehoert.
    ///
    /// Nur die registrierte Verbindung darf die Sitzung abbauen: der Close
    /// eines abgewiesenen Doppelgaengers traegt denselben Benutzernamen.
    fn trennen(&mut self, benutzername: &str, verbindung: &Verbindung) {
        let registriert = self
            .sitzungen
            .verbindung(benutzername)
            .is_some_and(|aktiv| Arc::ptr_eq(aktiv, verbindung));
        if !registriert {
            tracing::debug!(
                benutzer = benutzername,
                "Close einer nicht registrierten Verbindung ignoriert"
            );
            return;
        }

        self.voice.alle_verlassen(benutzername);
        let betroffen = self
            .kanaele
            .ueberall_entfernen(benutzername, &self.praeferenzen);
        self.sitzungen.entfernen(benutzername);
        if !betroffen.is_empty() {
            self.kanal_liste_an_alle();
        }
    }

    // -- Frame-Dispatch ------------------------------------------------------

    fn eingehend(&mut self, benutzername: &str, roh: &str) {
        let ereignis = match Eingehend::parsen(roh) {
            Ok(ereignis) => ereignis,
            Err(e) => {
                tracing::warn!(benutzer = benutzername, fehler = %e, "Unparsebares Frame verworfen");
                return;
            }
        };

        if ereignis.event_type.nur_ausgehend() {
            self.fehler_senden(
                benutzername,
                format!(
                    "The event type {} is reserved for the server",
                    ereignis.event_type.wire_name()
                ),
            );
            return;
        }

        match ereignis.event_type {
            EreignisTyp::OnMessage => self.nachricht(benutzername, &ereignis),
            EreignisTyp::OnGetChannel => self.kanal_abrufen(benutzername, &ereignis),
            EreignisTyp::OnCreateChannel => self.kanal_anlegen(benutzername, &ereignis),
            EreignisTyp::OnJoinChannel => self.kanal_beitreten(benutzername, &ereignis),
            EreignisTyp::OnLeaveChannel => self.kanal_verlassen(benutzername, &ereignis),
            EreignisTyp::OnJoinVocalChannel => self.voice_beitreten(benutzername, &ereignis),
            EreignisTyp::OnLeaveVocalChannel => self.voice_verlassen(benutzername, &ereignis),
            // oben als nur-ausgehend abgefangen
            EreignisTyp::UpdateChannelsList
            | EreignisTyp::OnPeerSignal
            | EreignisTyp::OnJoinedVoiceChannel
            | EreignisTyp::OnError => {}
        }
    }

    // -- Chat ----------------------------------------------------------------

    fn nachricht(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        let text = match ereignis.daten_als_text() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                self.fehler_senden(benutzername, KanalFehler::NachrichtLeer.to_string());
                return;
            }
        };

        if self.kommandos.ist_kommando(&text) {
            self.kommando_ausfuehren(benutzername, kanal_id, &text);
            return;
        }

        let nachricht = plauderei_protocol::Nachricht::neu(kanal_id, text, benutzername);
        self.kanaele.nachricht_verteilen(&kanal_id, nachricht);
    }

    /// Kommando-Antworten gehen als Admin-Nachricht nur an den Aufrufer und
    /// landen nie im Verlauf
    fn kommando_ausfuehren(&mut self, benutzername: &str, kanal_id: KanalId, text: &str) {
        let Some(kanal) = self.kanaele.kanal(&kanal_id) else {
            return;
        };
        let kanal_name = kanal.name.clone();
        let mut mitglieder: Vec<String> = kanal.mitglieder.keys().cloned().collect();
        mitglieder.sort();

        let kontext = KommandoKontext {
            aufrufer: benutzername,
            kanal_id,
            kanal_name: &kanal_name,
            mitglieder,
        };
        let Some(ergebnis) = self.kommandos.ausfuehren(text, &kontext) else {
            return;
        };

        let umschlag = Ausgehend::vom_admin(
            EreignisTyp::OnMessage,
            Some(kanal_id),
            Value::String(ergebnis.antwort),
        );
        self.sitzungen.senden(benutzername, &umschlag);

        match ergebnis.wirkung {
            Some(KommandoWirkung::UpdatesStummschalten(stumm)) => {
                self.praeferenzen.updates_stummschalten(benutzername, stumm);
            }
            Some(KommandoWirkung::LeereKanaeleEntfernen) => {
                // Mit dem Kanal enden auch seine Voice-Sitzungen
                for geloescht in self.kanaele.leere_aufraeumen() {
                    self.voice.kanal_schliessen(&geloescht);
                }
                self.kanal_liste_an_alle();
            }
            None => {}
        }
    }

    fn kanal_abrufen(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        let Some(kanal) = self.kanaele.kanal(&kanal_id) else {
            return;
        };
        match serde_json::to_value(kanal.auszug()) {
            Ok(wert) => {
                let umschlag =
                    Ausgehend::vom_admin(EreignisTyp::OnGetChannel, Some(kanal_id), wert);
                self.sitzungen.senden(benutzername, &umschlag);
            }
            Err(e) => tracing::error!(fehler = %e, "Kanal-Auszug nicht serialisierbar"),
        }
    }

    // -- Kanal-Verwaltung ----------------------------------------------------

    fn kanal_anlegen(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(daten) = ereignis.daten_als::<KanalAnlegenDaten>() else {
            self.fehler_senden(benutzername, KanalFehler::NameFehlt.to_string());
            return;
        };
        if let Err(fehler) = self.kanaele.name_pruefen(&daten.channel_name) {
            self.fehler_senden(benutzername, fehler.to_string());
            return;
        }

        match daten.password.filter(|p| !p.is_empty()) {
            Some(passwort) => {
                let hasher = self.hasher.clone();
                let intern = self.intern.clone();
                let ersteller = benutzername.to_string();
                let name = daten.channel_name.clone();
                tokio::task::spawn_blocking(move || {
                    let hash = hasher.hashen(&passwort);
                    let folge = HashFolge::KanalAnlegen {
                        ersteller,
                        name,
                        hash,
                    };
                    if intern
                        .blocking_send(RouterEreignis::HashFertig(folge))
                        .is_err()
                    {
                        tracing::warn!("Router-Queue geschlossen, Hash-Ergebnis verworfen");
                    }
                });
            }
            None => match self.kanaele.einfuegen(&daten.channel_name, None) {
                Ok(_) => self.kanal_liste_an_alle(),
                Err(fehler) => self.fehler_senden(benutzername, fehler.to_string()),
            },
        }
    }

    fn kanal_beitreten(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        let Some(kanal) = self.kanaele.kanal(&kanal_id) else {
            return;
        };

        // Wiederholte Beitritte in einen Kanal in dem man schon ist, sind
        // das Spam-Signal
        if kanal.hat_mitglied(benutzername) {
            if self.spam.duplikat_vermerken(benutzername) {
                self.sitzungen.schliessen(
                    benutzername,
                    schliess_code::RICHTLINIEN_VERSTOSS,
                    SPAM_GRUND,
                );
            }
            return;
        }

        let passwort_hash = kanal.passwort_hash.clone();
        match passwort_hash {
            Some(hash) => {
                let daten = ereignis.daten_als::<KanalBeitrittDaten>().unwrap_or_default();
                let Some(passwort) = daten.password.filter(|p| !p.is_empty()) else {
                    self.fehler_senden(
                        benutzername,
                        KanalFehler::PasswortErforderlich.to_string(),
                    );
                    return;
                };

                let hasher = self.hasher.clone();
                let intern = self.intern.clone();
                let benutzername = benutzername.to_string();
                tokio::task::spawn_blocking(move || {
                    let korrekt = hasher.verifizieren(&passwort, &hash);
                    let folge = HashFolge::BeitrittAbschliessen {
                        benutzername,
                        kanal_id,
                        korrekt,
                    };
                    if intern
                        .blocking_send(RouterEreignis::HashFertig(folge))
                        .is_err()
                    {
                        tracing::warn!("Router-Queue geschlossen, Verifikation verworfen");
                    }
                });
            }
            None => self.beitritt_abschliessen(benutzername, kanal_id),
        }
    }

    /// Nimmt den Benutzer tatsaechlich auf.
    ///
    /// Laeuft auch als Fortsetzung nach der Passwort-Verifikation; bis dahin
    /// kann der Benutzer getrennt oder der Kanal aufgeraeumt worden sein.
    fn beitritt_abschliessen(&mut self, benutzername: &str, kanal_id: KanalId) {
        let Some(verbindung) = self.sitzungen.verbindung(benutzername).cloned() else {
            return;
        };
        if self.kanaele.kanal(&kanal_id).is_none() {
            self.fehler_senden(
                benutzername,
                KanalFehler::KanalNichtGefunden(kanal_id.to_string()).to_string(),
            );
            return;
        }

        if self
            .kanaele
            .mitglied_aufnehmen(&kanal_id, benutzername, verbindung, &self.praeferenzen)
        {
            self.kanal_liste_an_alle();
        }
    }

    fn kanal_verlassen(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        let Some(kanal) = self.kanaele.kanal(&kanal_id) else {
            return;
        };
        if kanal.ist_standard {
            self.fehler_senden(
                benutzername,
                KanalFehler::StandardKanalNichtVerlassbar(kanal.name.clone()).to_string(),
            );
            return;
        }

        self.kanaele
            .mitglied_entfernen(&kanal_id, benutzername, &self.praeferenzen);
        // Eine Voice-Sitzung besteht nur solange die Mitgliedschaft besteht
        if self.voice.ist_teilnehmer(&kanal_id, benutzername) {
            self.voice.verlassen(benutzername, kanal_id);
        }
        self.kanal_liste_an_alle();
    }

    // -- Voice ---------------------------------------------------------------

    fn voice_beitreten(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        let daten = ereignis
            .daten_als::<VoiceBeitrittDaten>()
            .unwrap_or(VoiceBeitrittDaten {
                signal: None,
                stream_id: None,
            });
        self.voice.beitreten(benutzername, kanal_id, daten);
    }

    fn voice_verlassen(&mut self, benutzername: &str, ereignis: &Eingehend) {
        let Some(kanal_id) = self.kanal_aufloesen(benutzername, ereignis) else {
            return;
        };
        self.voice.verlassen(benutzername, kanal_id);
    }

    // -- Hash-Fortsetzungen --------------------------------------------------

    fn hash_fertig(&mut self, folge: HashFolge) {
        match folge {
            HashFolge::KanalAnlegen {
                ersteller,
                name,
                hash,
            } => match hash {
                // `einfuegen` prueft den Namen erneut: ein konkurrierendes
                // Anlegen kann waehrend des Hashings gewonnen haben
                Ok(hash) => match self.kanaele.einfuegen(&name, Some(hash)) {
                    Ok(_) => self.kanal_liste_an_alle(),
                    Err(fehler) => self.fehler_senden(&ersteller, fehler.to_string()),
                },
                Err(e) => {
                    tracing::error!(fehler = %e, kanal = name, "Hashing fehlgeschlagen");
                    self.fehler_senden(&ersteller, INTERNER_FEHLER);
                }
            },
            HashFolge::BeitrittAbschliessen {
                benutzername,
                kanal_id,
                korrekt,
            } => match korrekt {
                Ok(true) => self.beitritt_abschliessen(&benutzername, kanal_id),
                Ok(false) => {
                    self.fehler_senden(&benutzername, KanalFehler::PasswortFalsch.to_string())
                }
                Err(e) => {
                    tracing::error!(fehler = %e, "Passwort-Verifikation fehlgeschlagen");
                    self.fehler_senden(&benutzername, INTERNER_FEHLER);
                }
            },
        }
    }

    // -- Hilfen --------------------------------------------------------------

    /// Lesezugriff auf das Voice-Relais (Zustandsabfragen)
    pub fn voice(&self) -> &VoiceRelais {
        &self.voice
    }

    /// Loest die Kanal-ID eines Umschlags auf; unparsebar oder unbekannt
    /// ergibt denselben "does not exist"-Fehler an den Absender
    fn kanal_aufloesen(&self, benutzername: &str, ereignis: &Eingehend) -> Option<KanalId> {
        match ereignis.kanal_id() {
            Some(id) if self.kanaele.kanal(&id).is_some() => Some(id),
            _ => {
                let roh = ereignis.channel_id.as_deref().unwrap_or("null");
                self.fehler_senden(
                    benutzername,
                    KanalFehler::KanalNichtGefunden(roh.to_string()).to_string(),
                );
                None
            }
        }
    }

    fn fehler_senden(&self, benutzername: &str, text: impl Into<String>) {
        self.sitzungen.senden(benutzername, &Ausgehend::fehler(text));
    }

    fn kanal_liste_senden(&self, benutzername: &str) {
        match serde_json::to_value(self.kanaele.beschreibungen_fuer(benutzername)) {
            Ok(wert) => {
                let umschlag = Ausgehend::vom_admin(EreignisTyp::UpdateChannelsList, None, wert);
                self.sitzungen.senden(benutzername, &umschlag);
            }
            Err(e) => tracing::error!(fehler = %e, "Kanal-Liste nicht serialisierbar"),
        }
    }

    /// Verteilt die Kanal-Liste an alle, personalisiert pro Empfaenger
    /// (joinStatus haengt vom Betrachter ab)
    fn kanal_liste_an_alle(&self) {
        let namen: Vec<String> = self
            .sitzungen
            .benutzernamen()
            .map(str::to_string)
            .collect();
        for name in namen {
            self.kanal_liste_senden(&name);
        }
    }
}

// ---------------------------------------------------------------------------
// Dienst
// ---------------------------------------------------------------------------

/// Treibt den Router: konsumiert die Queue bis alle Sender weg sind
pub struct RouterDienst {
    router: EreignisRouter,
    ereignisse: mpsc::Receiver<RouterEreignis>,
}

impl RouterDienst {
    /// Erstellt Router samt Queue; der Sender geht an den Transport
    pub fn neu(
        kanaele: KanalStore,
        hasher: Arc<dyn PasswortHasher>,
        fabrik: Box<dyn PeerFabrik>,
    ) -> (Self, mpsc::Sender<RouterEreignis>) {
        let (sender, ereignisse) = mpsc::channel(EREIGNIS_PUFFER);
        let router = EreignisRouter::neu(kanaele, hasher, fabrik, sender.clone());
        (Self { router, ereignisse }, sender)
    }

    pub async fn ausfuehren(mut self) {
        tracing::info!("Ereignis-Router gestartet");
        while let Some(ereignis) = self.ereignisse.recv().await {
            self.router.verarbeiten(ereignis);
        }
        tracing::info!("Ereignis-Router beendet");
    }
}
