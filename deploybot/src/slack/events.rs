//! Slack Events API payloads and request signature verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// Requests older than this are rejected as possible replays.
pub const MAX_REQUEST_AGE_SECS: u64 = 60 * 5;

const SIGNATURE_VERSION: &str = "v0";

/// Outer Events API envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "url_verification")]
    UrlVerification { challenge: String },
    #[serde(rename = "event_callback")]
    EventCallback { event: Event },
    #[serde(other)]
    Other,
}

/// Inner event. Only `message` events are acted on.
#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// A user message the bot should look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

impl Event {
    /// Plain user messages only: edits, joins and bot posts are skipped, as
    /// are messages from `own_user`.
    pub fn into_chat_message(self, own_user: Option<&str>) -> Option<ChatMessage> {
        if self.kind != "message" || self.subtype.is_some() || self.bot_id.is_some() {
            return None;
        }
        let user = self.user?;
        if own_user == Some(user.as_str()) {
            return None;
        }
        Some(ChatMessage {
            channel: self.channel?,
            user,
            text: unescape(&self.text?),
            thread_ts: self.thread_ts,
        })
    }
}

/// Undo Slack's HTML-style escaping of message text.
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing signature headers")]
    Missing,
    #[error("request timestamp out of range")]
    Stale,
    #[error("invalid signature")]
    Invalid,
}

/// Check `X-Slack-Signature` against the raw request body.
pub fn verify_signature(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::Missing);
    };
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Invalid)?;
    if now.abs_diff(ts) > MAX_REQUEST_AGE_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = signature
        .strip_prefix(&format!("{SIGNATURE_VERSION}="))
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Invalid)?;

    let mac = base_mac(secret, timestamp, body).ok_or(SignatureError::Invalid)?;
    mac.verify_slice(&expected).map_err(|_| SignatureError::Invalid)
}

/// `v0=<hex>` signature Slack would send for this request.
#[cfg(test)]
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mac = base_mac(secret, timestamp, body).unwrap();
    format!("{SIGNATURE_VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

fn base_mac(secret: &str, timestamp: &str, body: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn accepts_valid_signature() {
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J";
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, body);
        assert!(sig.starts_with("v0="));
        assert_eq!(verify_signature(SECRET, Some(&ts), Some(&sig), body, NOW), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let ts = NOW.to_string();
        let sig = sign(SECRET, &ts, b"original");
        assert_eq!(
            verify_signature(SECRET, Some(&ts), Some(&sig), b"tampered", NOW),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            verify_signature("other", Some(&ts), Some(&sig), b"original", NOW),
            Err(SignatureError::Invalid)
        );
        assert_eq!(
            verify_signature(SECRET, Some(&ts), Some("v0=zz"), b"original", NOW),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn rejects_stale_and_missing() {
        let old = (NOW - MAX_REQUEST_AGE_SECS as i64 - 1).to_string();
        let sig = sign(SECRET, &old, b"x");
        assert_eq!(
            verify_signature(SECRET, Some(&old), Some(&sig), b"x", NOW),
            Err(SignatureError::Stale)
        );
        assert_eq!(
            verify_signature(SECRET, None, Some(&sig), b"x", NOW),
            Err(SignatureError::Missing)
        );
    }

    #[test]
    fn decodes_url_verification() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"url_verification","token":"t","challenge":"abc"}"#).unwrap();
        assert!(matches!(env, Envelope::UrlVerification { challenge } if challenge == "abc"));

        let env: Envelope = serde_json::from_str(r#"{"type":"app_rate_limited"}"#).unwrap();
        assert!(matches!(env, Envelope::Other));
    }

    #[test]
    fn decodes_user_message() {
        let env: Envelope = serde_json::from_str(
            r#"{"type":"event_callback","event":{"type":"message","channel":"C1","user":"U1",
                "text":"!deploy a b c &amp; d","ts":"1.2"}}"#,
        )
        .unwrap();
        let Envelope::EventCallback { event } = env else {
            panic!("expected event_callback");
        };
        assert_eq!(
            event.into_chat_message(Some("UBOT")),
            Some(ChatMessage {
                channel: "C1".to_string(),
                user: "U1".to_string(),
                text: "!deploy a b c & d".to_string(),
                thread_ts: None,
            })
        );
    }

    #[test]
    fn skips_bot_and_edited_messages() {
        let own: Event = serde_json::from_str(
            r#"{"type":"message","channel":"C1","user":"UBOT","text":"hi"}"#,
        )
        .unwrap();
        assert_eq!(own.into_chat_message(Some("UBOT")), None);

        let bot: Event = serde_json::from_str(
            r#"{"type":"message","channel":"C1","bot_id":"B1","text":"hi"}"#,
        )
        .unwrap();
        assert_eq!(bot.into_chat_message(None), None);

        let edited: Event = serde_json::from_str(
            r#"{"type":"message","subtype":"message_changed","channel":"C1"}"#,
        )
        .unwrap();
        assert_eq!(edited.into_chat_message(None), None);
    }
}
