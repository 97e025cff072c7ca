//! Admin-Textkommandos
//!
//! Eine feste Tabelle von Kommandonamen auf Handler – Tagged Dispatch statt
//! Vererbung. Die Ausfuehrung ist synchron und deterministisch: jeder
//! Handler erhaelt einen Kontext-Schnappschuss und produziert genau eine
//! Admin-Antwort an den Aufrufer plus optional eine Wirkung, die der Router
//! anschliessend anwendet (Stummschaltung, Kanal-Aufraeumen).
//!
//! Text der mit dem Kommando-Praefix beginnt aber nicht registriert ist,
//! faellt im Router auf normalen Chat-Broadcast zurueck.

use plauderei_core::types::KanalId;

/// Schnappschuss des Zustands den ein Kommando sehen darf
#[derive(Debug)]
pub struct KommandoKontext<'a> {
    /// Benutzername des Aufrufers
    pub aufrufer: &'a str,
    /// Kanal in dem das Kommando abgesetzt wurde
    pub kanal_id: KanalId,
    pub kanal_name: &'a str,
    /// Mitgliedernamen des Kanals (fuer !who / !users)
    pub mitglieder: Vec<String>,
}

/// Nebenwirkung eines Kommandos, vom Router angewendet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KommandoWirkung {
    /// Join/Leave-Hinweise fuer den Aufrufer (de)aktivieren
    UpdatesStummschalten(bool),
    /// Leere nicht-standard Kanaele loeschen und Kanal-Liste verteilen
    LeereKanaeleEntfernen,
}

/// Ergebnis einer Kommando-Ausfuehrung
#[derive(Debug)]
pub struct KommandoErgebnis {
    /// Antworttext, geht als Admin-Nachricht nur an den Aufrufer
    pub antwort: String,
    pub wirkung: Option<KommandoWirkung>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KommandoArt {
    Willkommen,
    HilfeText,
    HilfeHtml,
    Benutzerzahl,
    Benutzerliste,
    Aufraeumen,
    Stummschalten,
    Lautschalten,
}

struct KommandoEintrag {
    name: &'static str,
    hilfe: &'static str,
    art: KommandoArt,
}

/// Willkommenstext, wird auch beim Verbinden ausgefuehrt
const WILLKOMMEN: &str = "Welcome to my server! To show a list of commands, simply send a message with \"!help\" (for text-only) or \"!help-html\" (for formatted help).";

/// Registry aller Kommandos (feste Tabelle, Reihenfolge = Hilfe-Reihenfolge)
pub struct Kommandos {
    eintraege: Vec<KommandoEintrag>,
}

impl Kommandos {
    /// Erstellt die Registry mit der festen Kommando-Tabelle
    pub fn neu() -> Self {
        Self {
            eintraege: vec![
                KommandoEintrag {
                    name: "!welcome",
                    hilfe: "Show the welcome message.",
                    art: KommandoArt::Willkommen,
                },
                KommandoEintrag {
                    name: "!help",
                    hilfe: "Displays a text-only help message",
                    art: KommandoArt::HilfeText,
                },
                KommandoEintrag {
                    name: "!help-html",
                    hilfe: "Displays an html-formatted help message",
                    art: KommandoArt::HilfeHtml,
                },
                KommandoEintrag {
                    name: "!users",
                    hilfe: "Shows the number of users connected to a channel",
                    art: KommandoArt::Benutzerzahl,
                },
                KommandoEintrag {
                    name: "!who",
                    hilfe: "Shows the complete list of users for a specific channel",
                    art: KommandoArt::Benutzerliste,
                },
                KommandoEintrag {
                    name: "!clean",
                    hilfe: "Clears the list of channels if there are less than 2 users in them.",
                    art: KommandoArt::Aufraeumen,
                },
                KommandoEintrag {
                    name: "!mute-channel-updates",
                    hilfe: "Mutes the join/leave messages for a user.",
                    art: KommandoArt::Stummschalten,
                },
                KommandoEintrag {
                    name: "!unmute-channel-updates",
                    hilfe: "Unmutes the join/leave messages for a user.",
                    art: KommandoArt::Lautschalten,
                },
            ],
        }
    }

    fn finden(&self, text: &str) -> Option<&KommandoEintrag> {
        let gesucht = text.to_lowercase();
        self.eintraege.iter().find(|e| e.name == gesucht)
    }

    /// Gibt true zurueck wenn der Text ein registriertes Kommando ist
    /// (case-insensitiv)
    pub fn ist_kommando(&self, text: &str) -> bool {
        self.finden(text).is_some()
    }

    /// Fuehrt ein Kommando aus; None wenn der Text keines ist
    pub fn ausfuehren(&self, text: &str, kontext: &KommandoKontext<'_>) -> Option<KommandoErgebnis> {
        let eintrag = self.finden(text)?;
        let ergebnis = match eintrag.art {
            KommandoArt::Willkommen => KommandoErgebnis {
                antwort: WILLKOMMEN.to_string(),
                wirkung: None,
            },
            KommandoArt::HilfeText => KommandoErgebnis {
                antwort: self.hilfe_text(),
                wirkung: None,
            },
            KommandoArt::HilfeHtml => KommandoErgebnis {
                antwort: self.hilfe_html(),
                wirkung: None,
            },
            KommandoArt::Benutzerzahl => {
                let anzahl = kontext.mitglieder.len();
                let mehrzahl = if anzahl == 1 { "" } else { "s" };
                KommandoErgebnis {
                    antwort: format!(
                        "The channel {} has {anzahl} user{mehrzahl} connected to it.",
                        kontext.kanal_name
                    ),
                    wirkung: None,
                }
            }
            KommandoArt::Benutzerliste => KommandoErgebnis {
                antwort: format!(
                    "The channel {} has the following {} users connected to it: {}",
                    kontext.kanal_name,
                    kontext.mitglieder.len(),
                    kontext.mitglieder.join(", ")
                ),
                wirkung: None,
            },
            KommandoArt::Aufraeumen => KommandoErgebnis {
                antwort: "Clean command has been executed.".to_string(),
                wirkung: Some(KommandoWirkung::LeereKanaeleEntfernen),
            },
            KommandoArt::Stummschalten => KommandoErgebnis {
                antwort: "Join/leave messages are now muted. Use !unmute-channel-updates to unmute."
                    .to_string(),
                wirkung: Some(KommandoWirkung::UpdatesStummschalten(true)),
            },
            KommandoArt::Lautschalten => KommandoErgebnis {
                antwort: "Join/leave messages are now unmuted. Use !mute-channel-updates to mute."
                    .to_string(),
                wirkung: Some(KommandoWirkung::UpdatesStummschalten(false)),
            },
        };

        tracing::debug!(
            kommando = eintrag.name,
            aufrufer = kontext.aufrufer,
            kanal = kontext.kanal_name,
            "Kommando ausgefuehrt"
        );
        Some(ergebnis)
    }

    /// Gibt den Willkommenstext zurueck (auch beim Verbinden verwendet)
    pub fn willkommen(&self) -> &'static str {
        WILLKOMMEN
    }

    fn hilfe_text(&self) -> String {
        let mut hilfe = String::from("Here's a list of all the available commands:\n");
        for eintrag in &self.eintraege {
            hilfe.push_str(&format!("{} - {}\n", eintrag.name, eintrag.hilfe));
        }
        hilfe
    }

    fn hilfe_html(&self) -> String {
        let eintraege: String = self
            .eintraege
            .iter()
            .map(|e| format!("<li>{} - {}</li>", e.name, e.hilfe))
            .collect();
        format!("<p>Here's a list of all the available commands:<br><ul>{eintraege}</ul></p>")
    }
}

impl Default for Kommandos {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kontext<'a>(mitglieder: Vec<String>) -> KommandoKontext<'a> {
        KommandoKontext {
            aufrufer: "alice",
            kanal_id: KanalId::neu(),
            kanal_name: "Général",
            mitglieder,
        }
    }

    #[test]
    fn erkennung_ist_case_insensitiv() {
        let kommandos = Kommandos::neu();
        assert!(kommandos.ist_kommando("!help"));
        assert!(kommandos.ist_kommando("!HELP"));
        assert!(kommandos.ist_kommando("!Clean"));
        assert!(!kommandos.ist_kommando("!unbekannt"));
        assert!(!kommandos.ist_kommando("hallo"));
    }

    #[test]
    fn unbekanntes_kommando_faellt_durch() {
        let kommandos = Kommandos::neu();
        let ktx = kontext(vec![]);
        assert!(kommandos.ausfuehren("!gibtesnicht", &ktx).is_none());
    }

    #[test]
    fn benutzerzahl_mit_einzahl_und_mehrzahl() {
        let kommandos = Kommandos::neu();

        let eins = kommandos
            .ausfuehren("!users", &kontext(vec!["alice".into()]))
            .unwrap();
        assert_eq!(
            eins.antwort,
            "The channel Général has 1 user connected to it."
        );

        let zwei = kommandos
            .ausfuehren("!users", &kontext(vec!["alice".into(), "bob".into()]))
            .unwrap();
        assert_eq!(
            zwei.antwort,
            "The channel Général has 2 users connected to it."
        );
    }

    #[test]
    fn benutzerliste_nennt_alle_namen() {
        let kommandos = Kommandos::neu();
        let ergebnis = kommandos
            .ausfuehren("!who", &kontext(vec!["alice".into(), "bob".into()]))
            .unwrap();
        assert!(ergebnis.antwort.contains("alice, bob"));
        assert!(ergebnis.antwort.contains("2 users"));
    }

    #[test]
    fn wirkungen_der_zustandsaendernden_kommandos() {
        let kommandos = Kommandos::neu();
        let ktx = kontext(vec![]);

        let stumm = kommandos.ausfuehren("!mute-channel-updates", &ktx).unwrap();
        assert_eq!(stumm.wirkung, Some(KommandoWirkung::UpdatesStummschalten(true)));

        let laut = kommandos.ausfuehren("!unmute-channel-updates", &ktx).unwrap();
        assert_eq!(laut.wirkung, Some(KommandoWirkung::UpdatesStummschalten(false)));

        let sauber = kommandos.ausfuehren("!clean", &ktx).unwrap();
        assert_eq!(sauber.wirkung, Some(KommandoWirkung::LeereKanaeleEntfernen));

        let hilfe = kommandos.ausfuehren("!help", &ktx).unwrap();
        assert!(hilfe.wirkung.is_none());
    }

    #[test]
    fn hilfe_listet_alle_kommandos() {
        let kommandos = Kommandos::neu();
        let hilfe = kommandos.ausfuehren("!help", &kontext(vec![])).unwrap();
        for name in [
            "!welcome",
            "!help",
            "!help-html",
            "!users",
            "!who",
            "!clean",
            "!mute-channel-updates",
            "!unmute-channel-updates",
        ] {
            assert!(hilfe.antwort.contains(name), "{name} fehlt in der Hilfe");
        }

        let html = kommandos.ausfuehren("!help-html", &kontext(vec![])).unwrap();
        assert!(html.antwort.starts_with("<p>"));
        assert!(html.antwort.contains("<li>!welcome"));
    }
}
