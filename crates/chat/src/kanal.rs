//! Kanal-Entitaeten und der KanalStore
//!
//! Der Store besitzt alle lebenden Kanaele samt Mitgliedschafts-Maps und
//! Verlauf. Saemtliche Mutationen laufen ueber seine Methoden; der Router
//! ruft sie innerhalb eines einzelnen Dispatch-Durchlaufs auf, daher kommt
//! der Store ohne Locks aus.
//!
//! Die Kanaele werden in Einfuegereihenfolge gehalten, damit die
//! `updateChannelsList`-Broadcasts eine stabile Reihenfolge haben.

use std::collections::HashMap;

use plauderei_core::types::KanalId;
use plauderei_core::verbindung::Verbindung;
use plauderei_protocol::{Ausgehend, KanalAuszug, KanalBeschreibung, Nachricht};

use crate::error::KanalFehler;
use crate::praeferenzen::PraeferenzStore;
use crate::verlauf::BegrenzterVerlauf;

/// Erlaubte Laenge eines Kanalnamens (in Zeichen, nicht Bytes)
const NAME_MIN: usize = 5;
const NAME_MAX: usize = 20;

/// Ein lebender Kanal
pub struct Kanal {
    pub id: KanalId,
    pub name: String,
    /// PHC-Hash des Kanal-Passworts (None = offen)
    pub passwort_hash: Option<String>,
    /// Standard-Kanaele werden beim Start gesaet und sind weder loeschbar
    /// noch verlassbar
    pub ist_standard: bool,
    /// Nur Standard-Kanaele koennen beim Verbinden automatisch betreten werden
    pub auto_beitritt: bool,
    pub verlauf: BegrenzterVerlauf,
    /// Mitglieder: Benutzername -> Verbindungs-Handle
    pub mitglieder: HashMap<String, Verbindung>,
}

impl Kanal {
    fn neu(id: KanalId, name: String, passwort_hash: Option<String>, ist_standard: bool, auto_beitritt: bool) -> Self {
        Self {
            id,
            name,
            passwort_hash,
            ist_standard,
            auto_beitritt,
            verlauf: BegrenzterVerlauf::neu(),
            mitglieder: HashMap::new(),
        }
    }

    /// Gibt true zurueck wenn der Benutzer Mitglied ist
    pub fn hat_mitglied(&self, benutzername: &str) -> bool {
        self.mitglieder.contains_key(benutzername)
    }

    /// Kanal samt Verlauf fuer `onGetChannel`-Antworten
    pub fn auszug(&self) -> KanalAuszug {
        KanalAuszug {
            id: self.id,
            name: self.name.clone(),
            messages: self.verlauf.als_liste(),
        }
    }
}

/// Besitzt alle lebenden Kanaele
#[derive(Default)]
pub struct KanalStore {
    kanaele: Vec<Kanal>,
}

impl KanalStore {
    /// Erstellt einen leeren Store
    pub fn neu() -> Self {
        Self::default()
    }

    /// Saet einen Standard-Kanal (beim Serverstart)
    pub fn standard_kanal_saeen(&mut self, name: impl Into<String>, auto_beitritt: bool) -> KanalId {
        let id = self.freie_id();
        let name = name.into();
        tracing::info!(kanal = %name, %id, auto_beitritt, "Standard-Kanal gesaet");
        self.kanaele.push(Kanal::neu(id, name, None, true, auto_beitritt));
        id
    }

    fn freie_id(&self) -> KanalId {
        loop {
            let id = KanalId::neu();
            if self.kanal(&id).is_none() {
                return id;
            }
        }
    }

    /// Sucht einen Kanal
    pub fn kanal(&self, id: &KanalId) -> Option<&Kanal> {
        self.kanaele.iter().find(|k| &k.id == id)
    }

    /// Sucht einen Kanal (veraenderbar)
    pub fn kanal_mut(&mut self, id: &KanalId) -> Option<&mut Kanal> {
        self.kanaele.iter_mut().find(|k| &k.id == id)
    }

    /// IDs der Kanaele mit gesetztem Auto-Beitritt
    pub fn auto_beitritt_kanaele(&self) -> Vec<KanalId> {
        self.kanaele
            .iter()
            .filter(|k| k.auto_beitritt)
            .map(|k| k.id)
            .collect()
    }

    /// ID des ersten Standard-Kanals (Ziel des Welcome-Kommandos)
    pub fn erster_standard_kanal(&self) -> Option<KanalId> {
        self.kanaele.iter().find(|k| k.ist_standard).map(|k| k.id)
    }

    /// Prueft einen Kanalnamen vor dem Anlegen.
    ///
    /// Die Laenge wird in Zeichen gemessen, nicht in Bytes – "Général"
    /// sind sieben Zeichen.
    pub fn name_pruefen(&self, name: &str) -> Result<(), KanalFehler> {
        if name.is_empty() {
            return Err(KanalFehler::NameFehlt);
        }
        let laenge = name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&laenge) {
            return Err(KanalFehler::NameLaengeUngueltig);
        }
        if let Some(kanal) = self.kanaele.iter().find(|k| k.name == name) {
            return Err(KanalFehler::NameVergeben(kanal.name.clone()));
        }
        Ok(())
    }

    /// Fuegt einen neuen Kanal ein.
    ///
    /// Der Name wird erneut geprueft: zwischen Validierung und Einfuegen
    /// liegt beim passwortgeschuetzten Anlegen das asynchrone Hashing, in
    /// dieser Luecke kann ein konkurrierendes Anlegen gewonnen haben.
    pub fn einfuegen(
        &mut self,
        name: &str,
        passwort_hash: Option<String>,
    ) -> Result<KanalId, KanalFehler> {
        self.name_pruefen(name)?;
        let id = self.freie_id();
        tracing::info!(kanal = %name, %id, geschuetzt = passwort_hash.is_some(), "Kanal angelegt");
        self.kanaele
            .push(Kanal::neu(id, name.to_string(), passwort_hash, false, false));
        Ok(id)
    }

    /// Nimmt einen Benutzer in den Kanal auf und verteilt den Join-Hinweis.
    ///
    /// Der Hinweis landet im Verlauf und geht an alle Mitglieder (inklusive
    /// des Beigetretenen), ausser an Mitglieder deren Praeferenz
    /// `ignoriert_updates` gesetzt hat. Gibt `false` zurueck wenn der
    /// Benutzer bereits Mitglied war (keine doppelten Eintraege).
    pub fn mitglied_aufnehmen(
        &mut self,
        id: &KanalId,
        benutzername: &str,
        verbindung: Verbindung,
        praeferenzen: &PraeferenzStore,
    ) -> bool {
        let Some(kanal) = self.kanal_mut(id) else {
            return false;
        };
        if kanal.hat_mitglied(benutzername) {
            return false;
        }
        kanal.mitglieder.insert(benutzername.to_string(), verbindung);

        let hinweis = Nachricht::vom_admin(*id, format!("{benutzername} a rejoint le groupe"));
        hinweis_verteilen(kanal, hinweis, praeferenzen);

        tracing::info!(benutzer = benutzername, kanal = %kanal.name, "Kanal beigetreten");
        true
    }

    /// Entfernt einen Benutzer aus dem Kanal und verteilt den Leave-Hinweis
    /// an die verbleibenden Mitglieder (gleiche Stumm-Praeferenz).
    pub fn mitglied_entfernen(
        &mut self,
        id: &KanalId,
        benutzername: &str,
        praeferenzen: &PraeferenzStore,
    ) {
        let Some(kanal) = self.kanal_mut(id) else {
            return;
        };
        if kanal.mitglieder.remove(benutzername).is_none() {
            return;
        }

        let hinweis = Nachricht::vom_admin(*id, format!("{benutzername} a quitté le groupe"));
        hinweis_verteilen(kanal, hinweis, praeferenzen);

        tracing::info!(benutzer = benutzername, kanal = %kanal.name, "Kanal verlassen");
    }

    /// Entfernt einen Benutzer aus allen Kanaelen (Verbindungsabbau).
    ///
    /// Gibt die IDs der betroffenen Kanaele zurueck.
    pub fn ueberall_entfernen(
        &mut self,
        benutzername: &str,
        praeferenzen: &PraeferenzStore,
    ) -> Vec<KanalId> {
        let betroffen: Vec<KanalId> = self
            .kanaele
            .iter()
            .filter(|k| k.hat_mitglied(benutzername))
            .map(|k| k.id)
            .collect();
        for id in &betroffen {
            self.mitglied_entfernen(id, benutzername, praeferenzen);
        }
        betroffen
    }

    /// Haengt eine Chat-Nachricht an den Verlauf und sendet sie an alle
    /// aktuellen Mitglieder (inklusive Absender, keine Stumm-Filterung).
    pub fn nachricht_verteilen(&mut self, id: &KanalId, nachricht: Nachricht) {
        let Some(kanal) = self.kanal_mut(id) else {
            return;
        };
        let umschlag = Ausgehend::aus_nachricht(&nachricht);
        kanal.verlauf.anfuegen(nachricht);

        match umschlag.als_json() {
            Ok(text) => {
                let mut fehlgeschlagen = 0usize;
                for verbindung in kanal.mitglieder.values() {
                    if !verbindung.senden(&text) {
                        fehlgeschlagen += 1;
                    }
                }
                if fehlgeschlagen > 0 {
                    tracing::debug!(kanal = %kanal.name, fehlgeschlagen, "Sendefehler beim Verteilen");
                }
            }
            Err(e) => tracing::error!(fehler = %e, "Nachricht nicht serialisierbar"),
        }
    }

    /// Loescht alle nicht-standard Kanaele mit hoechstens einem Mitglied.
    ///
    /// Gibt die IDs der geloeschten Kanaele zurueck, damit der Aufrufer
    /// abhaengigen Zustand (Voice-Sitzungen) nachziehen kann.
    pub fn leere_aufraeumen(&mut self) -> Vec<KanalId> {
        let geloescht: Vec<KanalId> = self
            .kanaele
            .iter()
            .filter(|k| !k.ist_standard && k.mitglieder.len() <= 1)
            .map(|k| k.id)
            .collect();
        self.kanaele
            .retain(|k| k.ist_standard || k.mitglieder.len() > 1);
        if !geloescht.is_empty() {
            tracing::info!(geloescht = geloescht.len(), "Leere Kanaele aufgeraeumt");
        }
        geloescht
    }

    /// Baut die Kanal-Liste aus Sicht eines Benutzers.
    ///
    /// Enthaelt nie Verlauf oder Passwort-Hashes.
    pub fn beschreibungen_fuer(&self, benutzername: &str) -> Vec<KanalBeschreibung> {
        self.kanaele
            .iter()
            .map(|k| KanalBeschreibung {
                id: k.id,
                name: k.name.clone(),
                join_status: k.hat_mitglied(benutzername),
                password_protected: k.passwort_hash.is_some(),
                messages: None,
                number_of_users: k.mitglieder.len(),
            })
            .collect()
    }

    /// Anzahl der lebenden Kanaele
    pub fn anzahl(&self) -> usize {
        self.kanaele.len()
    }
}

/// Verteilt einen Join/Leave-Hinweis an die Mitglieder eines Kanals.
///
/// Mitglieder mit gesetzter Stumm-Praeferenz werden uebersprungen; der
/// Hinweis landet trotzdem im Verlauf.
fn hinweis_verteilen(kanal: &mut Kanal, hinweis: Nachricht, praeferenzen: &PraeferenzStore) {
    let umschlag = Ausgehend::aus_nachricht(&hinweis);
    kanal.verlauf.anfuegen(hinweis);

    let text = match umschlag.als_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(fehler = %e, "Hinweis nicht serialisierbar");
            return;
        }
    };

    for (mitglied, verbindung) in &kanal.mitglieder {
        if praeferenzen.ignoriert_updates(mitglied) {
            continue;
        }
        verbindung.senden(&text);
    }
}
