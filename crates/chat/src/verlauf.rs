//! Begrenzter Nachrichtenverlauf pro Kanal
//!
//! Ein expliziter Ringpuffer mit fester Kapazitaet: beim Anfuegen ueber die
//! Kapazitaet hinaus faellt der aelteste Eintrag heraus. Die Laenge ist
//! damit zu jedem Zeitpunkt <= Kapazitaet.

use std::collections::VecDeque;

use plauderei_protocol::Nachricht;

/// Standard-Kapazitaet des Kanal-Verlaufs
pub const VERLAUF_KAPAZITAET: usize = 100;

/// Ringpuffer fuer Kanal-Nachrichten
#[derive(Debug, Clone)]
pub struct BegrenzterVerlauf {
    eintraege: VecDeque<Nachricht>,
    kapazitaet: usize,
}

impl BegrenzterVerlauf {
    /// Erstellt einen leeren Verlauf mit Standard-Kapazitaet
    pub fn neu() -> Self {
        Self::mit_kapazitaet(VERLAUF_KAPAZITAET)
    }

    /// Erstellt einen leeren Verlauf mit der angegebenen Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> Self {
        Self {
            eintraege: VecDeque::with_capacity(kapazitaet),
            kapazitaet,
        }
    }

    /// Fuegt eine Nachricht an und verdraengt bei voller Kapazitaet die aelteste
    pub fn anfuegen(&mut self, nachricht: Nachricht) {
        if self.eintraege.len() >= self.kapazitaet {
            self.eintraege.pop_front();
        }
        self.eintraege.push_back(nachricht);
    }

    /// Anzahl der gehaltenen Nachrichten
    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    /// Iteriert in Ankunftsreihenfolge (aelteste zuerst)
    pub fn iter(&self) -> impl Iterator<Item = &Nachricht> {
        self.eintraege.iter()
    }

    /// Kopiert den Verlauf in einen Vec (fuer `onGetChannel`-Antworten)
    pub fn als_liste(&self) -> Vec<Nachricht> {
        self.eintraege.iter().cloned().collect()
    }
}

impl Default for BegrenzterVerlauf {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plauderei_core::types::KanalId;

    fn nachricht(kanal: KanalId, nr: usize) -> Nachricht {
        Nachricht::neu(kanal, format!("Nachricht {nr}"), "tester")
    }

    #[test]
    fn anfuegen_unter_kapazitaet() {
        let kanal = KanalId::neu();
        let mut verlauf = BegrenzterVerlauf::neu();
        for nr in 0..40 {
            verlauf.anfuegen(nachricht(kanal, nr));
        }
        assert_eq!(verlauf.laenge(), 40);
    }

    #[test]
    fn verdraengung_haelt_die_letzten_100_in_reihenfolge() {
        let kanal = KanalId::neu();
        let mut verlauf = BegrenzterVerlauf::neu();
        for nr in 1..=150 {
            verlauf.anfuegen(nachricht(kanal, nr));
        }

        assert_eq!(verlauf.laenge(), 100);

        // Index 0 ist die 51. angefuegte Nachricht
        let erste = verlauf.iter().next().expect("Verlauf darf nicht leer sein");
        assert_eq!(erste.data, "Nachricht 51");

        // Ankunftsreihenfolge bleibt erhalten
        let liste = verlauf.als_liste();
        for (index, eintrag) in liste.iter().enumerate() {
            assert_eq!(eintrag.data, format!("Nachricht {}", index + 51));
        }
    }

    #[test]
    fn kleine_kapazitaet() {
        let kanal = KanalId::neu();
        let mut verlauf = BegrenzterVerlauf::mit_kapazitaet(2);
        verlauf.anfuegen(nachricht(kanal, 1));
        verlauf.anfuegen(nachricht(kanal, 2));
        verlauf.anfuegen(nachricht(kanal, 3));
        let liste = verlauf.als_liste();
        assert_eq!(liste.len(), 2);
        assert_eq!(liste[0].data, "Nachricht 2");
        assert_eq!(liste[1].data, "Nachricht 3");
    }
}
