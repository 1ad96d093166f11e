//! Signaling envelopes
//!
//! Every frame exchanged with the relay is a JSON object carrying a `type`
//! tag. The relay only ever looks at that tag: the session descriptions and
//! connectivity candidates travelling alongside it are kept as the exact text
//! that was received and forwarded unchanged.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Notification sent to the broadcaster whenever a viewer announces itself.
pub const VIEWER_CONNECTED: &str = r#"{"type":"viewer_connected"}"#;

/// The type tag of an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// Role announcement: the sender wants to watch.
    Viewer,
    /// Role announcement: the sender is the media source.
    Broadcaster,
    /// Session offer, broadcaster to viewers.
    Offer,
    /// Session answer, viewer to broadcaster.
    Answer,
    /// Connectivity candidate, either direction.
    Candidate,
    /// Any tag the relay does not route.
    Other(String),
}

impl SignalKind {
    fn from_tag(tag: &str) -> SignalKind {
        match tag {
            "viewer" => SignalKind::Viewer,
            "broadcaster" => SignalKind::Broadcaster,
            "offer" => SignalKind::Offer,
            "answer" => SignalKind::Answer,
            "candidate" => SignalKind::Candidate,
            other => SignalKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SignalKind::Viewer => "viewer",
            SignalKind::Broadcaster => "broadcaster",
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
            SignalKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound envelope could not be read as `{"type": "<string>", ...}`.
#[derive(Debug, thiserror::Error)]
pub enum MalformedSignal {
    #[error("malformed signal: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed signal: missing string `type` field")]
    MissingType,
}

/// A parsed envelope: its tag plus the original text, shared between all
/// recipients of a fan-out.
#[derive(Debug, Clone)]
pub struct Signal {
    kind: SignalKind,
    raw: Arc<str>,
}

impl Signal {
    /// Reads the `type` tag of `text`. Every other field is left untouched.
    pub fn parse(text: &str) -> Result<Signal, MalformedSignal> {
        let value: Value = serde_json::from_str(text)?;
        let tag = value
            .as_object()
            .and_then(|fields| fields.get("type"))
            .and_then(Value::as_str)
            .ok_or(MalformedSignal::MissingType)?;

        Ok(Signal {
            kind: SignalKind::from_tag(tag),
            raw: Arc::from(text),
        })
    }

    pub fn kind(&self) -> &SignalKind {
        &self.kind
    }

    /// The envelope exactly as the sender wrote it.
    pub fn raw(&self) -> &Arc<str> {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        let cases = [
            (r#"{"type":"viewer"}"#, SignalKind::Viewer),
            (r#"{"type":"broadcaster"}"#, SignalKind::Broadcaster),
            (r#"{"type":"offer","offer":{}}"#, SignalKind::Offer),
            (r#"{"type":"answer","answer":{}}"#, SignalKind::Answer),
            (r#"{"type":"candidate","candidate":{}}"#, SignalKind::Candidate),
        ];

        for (text, kind) in cases {
            assert_eq!(Signal::parse(text).unwrap().kind(), &kind);
        }
    }

    #[test]
    fn test_parse_unknown_tag() {
        let signal = Signal::parse(r#"{"type":"viewer_connected"}"#).unwrap();

        assert_eq!(
            signal.kind(),
            &SignalKind::Other("viewer_connected".to_string())
        );
        assert_eq!(signal.kind().to_string(), "viewer_connected");
    }

    #[test]
    fn test_raw_text_is_kept_verbatim() {
        // Odd spacing and key order must survive untouched.
        let text = r#"{ "offer" : {"sdp":"v=0\r\n","type":"offer"},  "type":"offer" }"#;
        let signal = Signal::parse(text).unwrap();

        assert_eq!(&**signal.raw(), text);
    }

    #[test]
    fn test_extra_fields_on_role_announcement() {
        let signal =
            Signal::parse(r#"{"type":"broadcaster","message":"Broadcaster connected"}"#).unwrap();

        assert_eq!(signal.kind(), &SignalKind::Broadcaster);
    }

    #[test]
    fn test_malformed_inputs() {
        for text in [
            "",
            "not json",
            "42",
            r#"["viewer"]"#,
            r#"{"kind":"viewer"}"#,
            r#"{"type":7}"#,
            r#"{"type":null}"#,
            r#"{"type":"viewer""#,
        ] {
            assert!(Signal::parse(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_missing_type_is_distinguished_from_bad_json() {
        assert!(matches!(
            Signal::parse(r#"{"offer":{}}"#),
            Err(MalformedSignal::MissingType)
        ));
        assert!(matches!(
            Signal::parse("{"),
            Err(MalformedSignal::Json(_))
        ));
    }

    #[test]
    fn test_viewer_connected_is_a_valid_envelope() {
        let value: serde_json::Value = serde_json::from_str(VIEWER_CONNECTED).unwrap();

        assert_eq!(value, serde_json::json!({ "type": "viewer_connected" }));
    }
}
