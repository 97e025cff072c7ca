//! plauderei-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod hashing;
pub mod medien;
pub mod websocket;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;

use plauderei_chat::KanalStore;
use plauderei_signaling::RouterDienst;

use config::ServerConfig;
use hashing::Argon2Hasher;
use medien::OhneMedienFabrik;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Standard-Kanaele saeen
    /// 2. Ereignis-Router starten
    /// 3. WebSocket-Listener annehmen lassen
    /// 4. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let mut kanaele = KanalStore::neu();
        for eintrag in &self.config.kanaele.standard {
            kanaele.standard_kanal_saeen(&eintrag.name, eintrag.auto_beitritt);
        }

        let (dienst, ereignisse) =
            RouterDienst::neu(kanaele, Arc::new(Argon2Hasher), Box::new(OhneMedienFabrik));
        tokio::spawn(dienst.ausfuehren());

        let adresse = self.config.ws_bind_adresse();
        let listener = TcpListener::bind(&adresse).await?;
        tracing::info!(
            server_name = %self.config.server.name,
            %adresse,
            kanaele = self.config.kanaele.standard.len(),
            "Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    break;
                }
                angenommen = listener.accept() => {
                    match angenommen {
                        Ok((stream, client_adresse)) => {
                            tokio::spawn(websocket::verbindung_bedienen(
                                stream,
                                client_adresse,
                                ereignisse.clone(),
                            ));
                        }
                        Err(e) => tracing::warn!(fehler = %e, "Annahme fehlgeschlagen"),
                    }
                }
            }
        }

        Ok(())
    }
}
