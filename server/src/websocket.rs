//! WebSocket-Transport
//!
//! Pro Verbindung laufen zwei Tasks: die Leseschleife (dieses Modul) und
//! ein Schreib-Task der eine Befehls-Queue abarbeitet. Das Verbindungs-
//! Handle fuer den Router schreibt nicht selbst, sondern legt Befehle per
//! `try_send` in die Queue; ein voller Puffer bedeutet einen Client der
//! nicht mitliest, das Frame wird verworfen und geloggt.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use plauderei_core::verbindung::{abnormal_schliessen, Verbindung, VerbindungsHandle};
use plauderei_signaling::RouterEreignis;

/// Groesse der Schreib-Queue pro Verbindung (Frames)
const SENDE_PUFFER: usize = 64;

/// Befehle an den Schreib-Task einer Verbindung
enum WsBefehl {
    Text(String),
    Schliessen { code: u16, grund: String },
}

/// Verbindungs-Handle fuer den Router; synchron und nie blockierend
struct WsVerbindung {
    befehle: mpsc::Sender<WsBefehl>,
}

impl VerbindungsHandle for WsVerbindung {
    fn senden(&self, text: &str) -> bool {
        let ok = self
            .befehle
            .try_send(WsBefehl::Text(text.to_string()))
            .is_ok();
        if !ok {
            tracing::warn!("Schreib-Queue voll oder geschlossen, Frame verworfen");
        }
        ok
    }

    fn schliessen(&self, code: u16, grund: &str) {
        let _ = self.befehle.try_send(WsBefehl::Schliessen {
            code,
            grund: grund.to_string(),
        });
    }
}

/// Liest den Benutzernamen aus dem Query-Teil der Handshake-URI
fn benutzername_aus_uri(uri: &str) -> String {
    Url::parse("ws://server.invalid")
        .ok()
        .and_then(|basis| basis.join(uri).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(schluessel, _)| schluessel == "username")
                .map(|(_, wert)| wert.into_owned())
        })
        .unwrap_or_default()
}

/// Bedient eine angenommene TCP-Verbindung bis zum Abbau.
///
/// Die Zulassung (fehlender/vergebener Name) entscheidet der Router nach
/// dem Handshake; der Transport liefert nur die Lebenszyklus-Ereignisse.
pub async fn verbindung_bedienen(
    stream: TcpStream,
    adresse: SocketAddr,
    ereignisse: mpsc::Sender<RouterEreignis>,
) {
    let mut benutzername = String::new();
    let handshake = |anfrage: &Request, antwort: Response| -> Result<Response, ErrorResponse> {
        benutzername = benutzername_aus_uri(&anfrage.uri().to_string());
        Ok(antwort)
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, handshake).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(%adresse, fehler = %e, "WebSocket-Handshake fehlgeschlagen");
            return;
        }
    };
    tracing::info!(benutzer = benutzername, %adresse, "Verbindung angenommen");

    let (mut schreiber, mut leser) = ws.split();
    let (befehle, mut befehle_empfang) = mpsc::channel(SENDE_PUFFER);

    // Schreib-Task: endet wenn alle Handle-Klone weg sind oder nach einem
    // Close-Befehl
    tokio::spawn(async move {
        while let Some(befehl) = befehle_empfang.recv().await {
            match befehl {
                WsBefehl::Text(text) => {
                    if let Err(e) = schreiber.send(Message::Text(text)).await {
                        tracing::debug!(fehler = %e, "Frame nicht sendbar");
                        break;
                    }
                }
                WsBefehl::Schliessen { code, grund } => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: grund.into(),
                    };
                    if let Err(e) = schreiber.send(Message::Close(Some(frame))).await {
                        tracing::debug!(fehler = %e, "Close-Frame nicht sendbar");
                    }
                    break;
                }
            }
        }
    });

    let verbindung: Verbindung = Arc::new(WsVerbindung { befehle });
    if ereignisse
        .send(RouterEreignis::Verbunden {
            benutzername: benutzername.clone(),
            verbindung: verbindung.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    let mut transport_fehler = None;
    while let Some(ergebnis) = leser.next().await {
        match ergebnis {
            Ok(Message::Text(roh)) => {
                let gesendet = ereignisse
                    .send(RouterEreignis::Eingehend {
                        benutzername: benutzername.clone(),
                        roh,
                    })
                    .await;
                if gesendet.is_err() {
                    return;
                }
            }
            Ok(Message::Close(_)) => break,
            // Ping/Pong beantwortet tungstenite selbst, Binary ist nicht Teil
            // des Protokolls
            Ok(_) => {}
            Err(e) => {
                transport_fehler = Some(e.to_string());
                break;
            }
        }
    }

    match transport_fehler {
        Some(fehler) => {
            tracing::warn!(benutzer = benutzername, %adresse, fehler, "Verbindung abgebrochen");
            abnormal_schliessen(&verbindung, &fehler);
            let _ = ereignisse
                .send(RouterEreignis::TransportFehler {
                    benutzername,
                    verbindung,
                    fehler,
                })
                .await;
        }
        None => {
            tracing::info!(benutzer = benutzername, %adresse, "Verbindung geschlossen");
            let _ = ereignisse
                .send(RouterEreignis::Getrennt {
                    benutzername,
                    verbindung,
                })
                .await;
        }
    }
}
