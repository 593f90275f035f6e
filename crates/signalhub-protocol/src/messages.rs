use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Kind of a signaling envelope.
///
/// Unrecognized strings are kept verbatim in [`SignalType::Unknown`] so the
/// relay can report what it dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalType {
    Join,
    Leave,
    Offer,
    Answer,
    Candidate,
    Error,
    Unknown(String),
}

impl SignalType {
    pub fn as_str(&self) -> &str {
        match self {
            SignalType::Join => "join",
            SignalType::Leave => "leave",
            SignalType::Offer => "offer",
            SignalType::Answer => "answer",
            SignalType::Candidate => "candidate",
            SignalType::Error => "error",
            SignalType::Unknown(other) => other,
        }
    }
}

impl Default for SignalType {
    fn default() -> Self {
        SignalType::Unknown(String::new())
    }
}

impl From<String> for SignalType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "join" => SignalType::Join,
            "leave" => SignalType::Leave,
            "offer" => SignalType::Offer,
            "answer" => SignalType::Answer,
            "candidate" => SignalType::Candidate,
            "error" => SignalType::Error,
            _ => SignalType::Unknown(value),
        }
    }
}

impl From<SignalType> for String {
    fn from(value: SignalType) -> Self {
        match value {
            SignalType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signaling envelope, exactly one per WebSocket frame.
///
/// `payload` is kept as the raw JSON text the sender produced and is written
/// back out unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    #[serde(rename = "type", default)]
    pub kind: SignalType,

    /// Sender peer id. Always assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Unicast target peer id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(default)]
    pub room_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalMessage {
    /// Join notice for `peer_id`; doubles as the acknowledgement sent to the
    /// joining peer itself.
    pub fn join(peer_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            kind: SignalType::Join,
            from: Some(peer_id.into()),
            room_id: room_id.into(),
            ..Default::default()
        }
    }

    pub fn leave(peer_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            kind: SignalType::Leave,
            from: Some(peer_id.into()),
            room_id: room_id.into(),
            ..Default::default()
        }
    }

    /// Overwrite whatever sender and room the client claimed.
    pub fn stamp(&mut self, peer_id: &str, room_id: &str) {
        self.from = Some(peer_id.to_string());
        self.room_id = room_id.to_string();
    }

    /// Unicast target, if one was given. An empty `to` counts as none.
    pub fn target(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }

    /// Whether this kind of message is forwarded between peers.
    pub fn is_relayable(&self) -> bool {
        matches!(
            self.kind,
            SignalType::Offer | SignalType::Answer | SignalType::Candidate
        )
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_envelope() {
        let msg = SignalMessage::from_json(
            r#"{"type":"offer","from":"x","to":"b","roomId":"r1","payload":{"sdp":"v=0"}}"#,
        )
        .unwrap();

        assert_eq!(msg.kind, SignalType::Offer);
        assert_eq!(msg.target(), Some("b"));
        assert_eq!(msg.room_id, "r1");
        assert_eq!(msg.payload.as_ref().unwrap().get(), r#"{"sdp":"v=0"}"#);
        assert!(msg.is_relayable());
    }

    #[test]
    fn unknown_type_is_preserved() {
        let msg = SignalMessage::from_json(r#"{"type":"renegotiate"}"#).unwrap();
        assert_eq!(msg.kind, SignalType::Unknown("renegotiate".to_string()));
        assert_eq!(msg.kind.to_string(), "renegotiate");
        assert!(!msg.is_relayable());
    }

    #[test]
    fn missing_fields_default() {
        let msg = SignalMessage::from_json("{}").unwrap();
        assert_eq!(msg.kind, SignalType::Unknown(String::new()));
        assert!(msg.from.is_none());
        assert!(msg.payload.is_none());
        assert_eq!(msg.room_id, "");
    }

    #[test]
    fn empty_target_counts_as_broadcast() {
        let msg = SignalMessage::from_json(r#"{"type":"candidate","to":""}"#).unwrap();
        assert_eq!(msg.target(), None);
    }

    #[test]
    fn stamp_overwrites_claimed_identity() {
        let mut msg =
            SignalMessage::from_json(r#"{"type":"answer","from":"mallory","roomId":"other"}"#)
                .unwrap();
        msg.stamp("alice", "room-a");
        assert_eq!(msg.from.as_deref(), Some("alice"));
        assert_eq!(msg.room_id, "room-a");
    }

    #[test]
    fn payload_bytes_survive_reencoding() {
        let payload = r#"{ "candidate" : "a=1 2  3", "n":[1,2.50,null] }"#;
        let text = format!(r#"{{"type":"candidate","roomId":"r","payload":{payload}}}"#);
        let msg = SignalMessage::from_json(&text).unwrap();

        let out = msg.to_json().unwrap();
        assert!(out.contains(payload), "payload was rewritten: {out}");
    }

    #[test]
    fn join_omits_absent_fields() {
        let json = SignalMessage::join("p1", "r1").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "join");
        assert_eq!(value["from"], "p1");
        assert_eq!(value["roomId"], "r1");
        assert!(value.get("to").is_none());
        assert!(value.get("payload").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_type_round_trips_as_string() {
        let msg = SignalMessage::from_json(r#"{"type":"error","error":"boom"}"#).unwrap();
        assert_eq!(msg.kind, SignalType::Error);
        assert_eq!(msg.error.as_deref(), Some("boom"));
    }
}
