//! Ereignis-Umschlaege (WebSocket, JSON)
//!
//! ## Design
//! - Tagged Envelope: jedes Frame traegt seinen `eventType` als String
//! - JSON-Serialisierung via serde (Text-Frames, nicht zeitkritisch)
//! - Eingehend und ausgehend teilen sich den `EreignisTyp`; welche Typen
//!   ein Client senden darf entscheidet der Router, nicht das Protokoll

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use plauderei_core::types::{KanalId, ABSENDER_ADMIN};

// ---------------------------------------------------------------------------
// Ereignistypen
// ---------------------------------------------------------------------------

/// Alle Ereignistypen die auf dem Draht vorkommen
///
/// Die Varianten `UpdateChannelsList`, `OnError`, `OnPeerSignal` und
/// `OnJoinedVoiceChannel` sind server-seitig; sendet ein Client sie,
/// antwortet der Router mit einem "wrong direction"-Fehler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EreignisTyp {
    #[serde(rename = "onMessage")]
    OnMessage,
    #[serde(rename = "onGetChannel")]
    OnGetChannel,
    #[serde(rename = "onCreateChannel")]
    OnCreateChannel,
    #[serde(rename = "onJoinChannel")]
    OnJoinChannel,
    #[serde(rename = "onLeaveChannel")]
    OnLeaveChannel,
    #[serde(rename = "onJoinVocalChannel")]
    OnJoinVocalChannel,
    #[serde(rename = "onLeaveVocalChannel")]
    OnLeaveVocalChannel,
    #[serde(rename = "updateChannelsList")]
    UpdateChannelsList,
    #[serde(rename = "onPeerSignal")]
    OnPeerSignal,
    #[serde(rename = "onJoinedVoiceChannel")]
    OnJoinedVoiceChannel,
    #[serde(rename = "onError")]
    OnError,
}

impl EreignisTyp {
    /// Name des Typs wie er auf dem Draht steht (fuer Fehlertexte)
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::OnMessage => "onMessage",
            Self::OnGetChannel => "onGetChannel",
            Self::OnCreateChannel => "onCreateChannel",
            Self::OnJoinChannel => "onJoinChannel",
            Self::OnLeaveChannel => "onLeaveChannel",
            Self::OnJoinVocalChannel => "onJoinVocalChannel",
            Self::OnLeaveVocalChannel => "onLeaveVocalChannel",
            Self::UpdateChannelsList => "updateChannelsList",
            Self::OnPeerSignal => "onPeerSignal",
            Self::OnJoinedVoiceChannel => "onJoinedVoiceChannel",
            Self::OnError => "onError",
        }
    }

    /// Ereignistypen die nur der Server erzeugen darf
    pub fn nur_ausgehend(&self) -> bool {
        matches!(
            self,
            Self::UpdateChannelsList
                | Self::OnPeerSignal
                | Self::OnJoinedVoiceChannel
                | Self::OnError
        )
    }
}

// ---------------------------------------------------------------------------
// Umschlaege
// ---------------------------------------------------------------------------

/// Eingehender Umschlag vom Client
///
/// `channelId` bleibt hier ein roher String: ein unparsebarer Wert wird vom
/// Router wie ein unbekannter Kanal behandelt, nicht wie ein kaputtes Frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Eingehend {
    #[serde(rename = "eventType")]
    pub event_type: EreignisTyp,
    #[serde(rename = "channelId", default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Eingehend {
    /// Parst ein rohes Text-Frame
    pub fn parsen(roh: &str) -> serde_json::Result<Self> {
        serde_json::from_str(roh)
    }

    /// Parst die Kanal-ID aus dem Umschlag (None wenn fehlend oder kaputt)
    pub fn kanal_id(&self) -> Option<KanalId> {
        self.channel_id.as_deref().and_then(KanalId::parsen)
    }

    /// Dekodiert das `data`-Feld in einen konkreten Payload-Typ
    pub fn daten_als<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.data
            .clone()
            .and_then(|wert| serde_json::from_value(wert).ok())
    }

    /// Gibt das `data`-Feld als Text zurueck (fuer onMessage)
    pub fn daten_als_text(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }
}

/// Ausgehender Umschlag an den Client
#[derive(Debug, Clone, Serialize)]
pub struct Ausgehend {
    #[serde(rename = "eventType")]
    pub event_type: EreignisTyp,
    #[serde(rename = "channelId")]
    pub channel_id: Option<KanalId>,
    pub data: Value,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl Ausgehend {
    /// Erstellt einen Admin-signierten Umschlag mit aktuellem Zeitstempel
    pub fn vom_admin(event_type: EreignisTyp, channel_id: Option<KanalId>, data: Value) -> Self {
        Self {
            event_type,
            channel_id,
            data,
            sender: ABSENDER_ADMIN.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Erstellt eine `onError`-Fehlermeldung (Kanal-unabhaengig)
    pub fn fehler(text: impl Into<String>) -> Self {
        Self::vom_admin(EreignisTyp::OnError, None, Value::String(text.into()))
    }

    /// Baut den Wire-Umschlag fuer eine Chat-Nachricht aus dem Verlauf
    pub fn aus_nachricht(nachricht: &Nachricht) -> Self {
        Self {
            event_type: nachricht.event_type,
            channel_id: Some(nachricht.channel_id),
            data: Value::String(nachricht.data.clone()),
            sender: nachricht.sender.clone(),
            timestamp: nachricht.timestamp,
        }
    }

    /// Serialisiert den Umschlag als Text-Frame
    pub fn als_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Nachrichten & Kanal-Beschreibungen
// ---------------------------------------------------------------------------

/// Eine im Kanal-Verlauf gespeicherte Nachricht
///
/// Unveraenderlich nach dem Anfuegen. Die Feldnamen entsprechen dem
/// Wire-Format, weil der Verlauf in `onGetChannel`-Antworten eingebettet wird.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nachricht {
    #[serde(rename = "eventType")]
    pub event_type: EreignisTyp,
    #[serde(rename = "channelId")]
    pub channel_id: KanalId,
    pub data: String,
    pub sender: String,
    pub timestamp: DateTime<Utc>,
}

impl Nachricht {
    /// Erstellt eine Chat-Nachricht mit aktuellem Zeitstempel
    pub fn neu(channel_id: KanalId, data: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            event_type: EreignisTyp::OnMessage,
            channel_id,
            data: data.into(),
            sender: sender.into(),
            timestamp: Utc::now(),
        }
    }

    /// Erstellt eine Admin-signierte Systemnachricht (Join/Leave-Hinweise)
    pub fn vom_admin(channel_id: KanalId, data: impl Into<String>) -> Self {
        Self::neu(channel_id, data, ABSENDER_ADMIN)
    }
}

/// Eintrag der Kanal-Liste (`updateChannelsList`)
///
/// `messages` ist auf dem Draht immer `null` – die Liste transportiert nie
/// Verlauf oder Passwort-Hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanalBeschreibung {
    pub id: KanalId,
    pub name: String,
    #[serde(rename = "joinStatus")]
    pub join_status: bool,
    #[serde(rename = "passwordProtected")]
    pub password_protected: bool,
    pub messages: Option<Vec<Nachricht>>,
    #[serde(rename = "numberOfUsers")]
    pub number_of_users: usize,
}

/// Antwort-Daten fuer `onGetChannel`: Kanal samt Verlauf
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanalAuszug {
    pub id: KanalId,
    pub name: String,
    pub messages: Vec<Nachricht>,
}

// ---------------------------------------------------------------------------
// Payloads eingehender Ereignisse
// ---------------------------------------------------------------------------

/// `onCreateChannel.data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanalAnlegenDaten {
    #[serde(rename = "channelName")]
    pub channel_name: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// `onJoinChannel.data`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KanalBeitrittDaten {
    #[serde(default)]
    pub password: Option<String>,
}

/// `onJoinVocalChannel.data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceBeitrittDaten {
    #[serde(default)]
    pub signal: Option<Value>,
    #[serde(rename = "streamId", default)]
    pub stream_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eingehend_parsen_mit_allen_feldern() {
        let id = KanalId::neu();
        let roh = format!(
            r#"{{"eventType":"onMessage","channelId":"{id}","data":"hallo"}}"#
        );
        let ereignis = Eingehend::parsen(&roh).expect("Umschlag muss parsebar sein");
        assert_eq!(ereignis.event_type, EreignisTyp::OnMessage);
        assert_eq!(ereignis.kanal_id(), Some(id));
        assert_eq!(ereignis.daten_als_text(), Some("hallo"));
    }

    #[test]
    fn eingehend_ohne_kanal_und_daten() {
        let ereignis = Eingehend::parsen(r#"{"eventType":"onError"}"#).unwrap();
        assert_eq!(ereignis.event_type, EreignisTyp::OnError);
        assert!(ereignis.kanal_id().is_none());
        assert!(ereignis.data.is_none());
    }

    #[test]
    fn unbekannter_ereignistyp_schlaegt_fehl() {
        assert!(Eingehend::parsen(r#"{"eventType":"onFrobnicate"}"#).is_err());
    }

    #[test]
    fn kaputte_kanal_id_wird_zu_none() {
        let ereignis =
            Eingehend::parsen(r#"{"eventType":"onMessage","channelId":"quatsch"}"#).unwrap();
        assert!(ereignis.kanal_id().is_none());
    }

    #[test]
    fn ausgehend_feldnamen_auf_dem_draht() {
        let id = KanalId::neu();
        let umschlag = Ausgehend::vom_admin(
            EreignisTyp::UpdateChannelsList,
            Some(id),
            Value::Null,
        );
        let json = umschlag.als_json().unwrap();
        assert!(json.contains(r#""eventType":"updateChannelsList""#));
        assert!(json.contains(r#""channelId":"#));
        assert!(json.contains(r#""sender":"Admin""#));
        assert!(json.contains(r#""timestamp":"#));
    }

    #[test]
    fn fehler_umschlag_ohne_kanal() {
        let umschlag = Ausgehend::fehler("Kaputt");
        assert_eq!(umschlag.event_type, EreignisTyp::OnError);
        assert!(umschlag.channel_id.is_none());
        assert_eq!(umschlag.data, Value::String("Kaputt".into()));
    }

    #[test]
    fn nachricht_im_wire_format() {
        let id = KanalId::neu();
        let nachricht = Nachricht::vom_admin(id, "jemand a rejoint le groupe");
        let json = serde_json::to_string(&nachricht).unwrap();
        assert!(json.contains(r#""eventType":"onMessage""#));
        assert!(json.contains(r#""channelId":"#));
        assert!(json.contains(r#""sender":"Admin""#));
    }

    #[test]
    fn kanal_beschreibung_feldnamen() {
        let beschreibung = KanalBeschreibung {
            id: KanalId::neu(),
            name: "Général".into(),
            join_status: true,
            password_protected: false,
            messages: None,
            number_of_users: 3,
        };
        let json = serde_json::to_string(&beschreibung).unwrap();
        assert!(json.contains(r#""joinStatus":true"#));
        assert!(json.contains(r#""numberOfUsers":3"#));
        assert!(json.contains(r#""messages":null"#));
        assert!(json.contains(r#""passwordProtected":false"#));
    }

    #[test]
    fn voice_beitritt_daten_dekodieren() {
        let roh = r#"{"eventType":"onJoinVocalChannel","data":{"signal":{"type":"offer"},"streamId":"abc"}}"#;
        let ereignis = Eingehend::parsen(roh).unwrap();
        let daten: VoiceBeitrittDaten = ereignis.daten_als().expect("Payload muss dekodierbar sein");
        assert_eq!(daten.stream_id.as_deref(), Some("abc"));
        assert!(daten.signal.is_some());
    }

    #[test]
    fn nur_ausgehende_typen() {
        assert!(EreignisTyp::UpdateChannelsList.nur_ausgehend());
        assert!(EreignisTyp::OnError.nur_ausgehend());
        assert!(EreignisTyp::OnPeerSignal.nur_ausgehend());
        assert!(EreignisTyp::OnJoinedVoiceChannel.nur_ausgehend());
        assert!(!EreignisTyp::OnMessage.nur_ausgehend());
        assert!(!EreignisTyp::OnGetChannel.nur_ausgehend());
    }
}
