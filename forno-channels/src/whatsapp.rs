//! WhatsApp Business Cloud API channel.
//!
//! Inbound messages arrive by webhook push; replies go out through the
//! Graph API. Webhook verification, payload traversal, and the outbound
//! call all live here so the HTTP service only shuttles JSON.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::message::InboundMessage;

const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com/v18.0";

/// WhatsApp channel over the Business Cloud API.
pub struct WhatsAppChannel {
    access_token: String,
    phone_number_id: String,
    verify_token: String,
    /// Digits-only numbers, or `*` to allow everyone.
    allowed_numbers: Vec<String>,
    base_url: String,
    client: Client,
}

impl WhatsAppChannel {
    pub fn new(
        access_token: String,
        phone_number_id: String,
        verify_token: String,
        allowed_numbers: Vec<String>,
    ) -> Self {
        let allowed_numbers = allowed_numbers
            .iter()
            .map(|n| normalize_number(n))
            .collect();
        Self {
            access_token,
            phone_number_id,
            verify_token,
            allowed_numbers,
            base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Point the channel at a different Graph API host. Test hook.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Answer Meta's webhook verification handshake.
    ///
    /// Returns the challenge to echo back when the mode and token match,
    /// `None` otherwise.
    pub fn verify_webhook(&self, mode: &str, token: &str, challenge: &str) -> Option<String> {
        if mode == "subscribe" && token == self.verify_token {
            Some(challenge.to_string())
        } else {
            tracing::warn!("WhatsApp webhook verification failed (mode: {mode})");
            None
        }
    }

    /// Whether a phone number may talk to the bot. `*` allows everyone;
    /// an empty list allows no one.
    pub fn is_number_allowed(&self, phone: &str) -> bool {
        let normalized = normalize_number(phone);
        self.allowed_numbers
            .iter()
            .any(|n| n == "*" || *n == normalized)
    }

    /// Lift text messages out of an incoming webhook payload.
    ///
    /// Status-update payloads and non-text messages yield nothing.
    /// Senders not on the allow-list are dropped with a warning.
    pub fn parse_webhook_payload(&self, payload: &Value) -> Vec<InboundMessage> {
        let mut messages = Vec::new();

        let Some(entries) = payload.get("entry").and_then(|e| e.as_array()) else {
            return messages;
        };

        for entry in entries {
            let Some(changes) = entry.get("changes").and_then(|c| c.as_array()) else {
                continue;
            };

            for change in changes {
                let Some(value) = change.get("value") else {
                    continue;
                };

                let Some(msgs) = value.get("messages").and_then(|m| m.as_array()) else {
                    continue;
                };

                for msg in msgs {
                    let Some(from) = msg.get("from").and_then(|f| f.as_str()) else {
                        continue;
                    };
                    let from = normalize_number(from);

                    if !self.is_number_allowed(&from) {
                        tracing::warn!("WhatsApp: ignoring message from unauthorized number {from}");
                        continue;
                    }

                    if msg.get("type").and_then(|t| t.as_str()) != Some("text") {
                        tracing::debug!("WhatsApp: skipping non-text message from {from}");
                        continue;
                    }

                    let text = msg
                        .get("text")
                        .and_then(|t| t.get("body"))
                        .and_then(|b| b.as_str())
                        .unwrap_or("")
                        .to_string();
                    if text.is_empty() {
                        continue;
                    }

                    let timestamp_ms = msg
                        .get("timestamp")
                        .and_then(|t| t.as_str())
                        .and_then(|t| t.parse::<i64>().ok())
                        .map(|ts| ts * 1000)
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

                    let id = msg
                        .get("id")
                        .and_then(|i| i.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

                    messages.push(InboundMessage {
                        id,
                        from,
                        text,
                        timestamp_ms,
                    });
                }
            }
        }

        messages
    }

    /// Send a text message through the Graph API.
    pub async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let to = normalize_number(to);

        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": body
            }
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error = resp.text().await.unwrap_or_default();
            anyhow::bail!("WhatsApp API error ({status}): {error}");
        }

        tracing::info!("WhatsApp message sent to {to}");
        Ok(())
    }
}

/// The Graph API and the session layer both want bare digits.
fn normalize_number(phone: &str) -> String {
    phone.strip_prefix('+').unwrap_or(phone).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_channel() -> WhatsAppChannel {
        WhatsAppChannel::new(
            "test-token".into(),
            "123456789".into(),
            "verify-me".into(),
            vec!["+923001234567".into()],
        )
    }

    #[test]
    fn verification_echoes_the_challenge() {
        let ch = make_channel();
        assert_eq!(
            ch.verify_webhook("subscribe", "verify-me", "challenge-42"),
            Some("challenge-42".to_string())
        );
    }

    #[test]
    fn verification_rejects_wrong_token_or_mode() {
        let ch = make_channel();
        assert_eq!(ch.verify_webhook("subscribe", "wrong", "c"), None);
        assert_eq!(ch.verify_webhook("unsubscribe", "verify-me", "c"), None);
    }

    #[test]
    fn number_allowed_ignores_plus_prefix() {
        let ch = make_channel();
        assert!(ch.is_number_allowed("923001234567"));
        assert!(ch.is_number_allowed("+923001234567"));
        assert!(!ch.is_number_allowed("15550000000"));
    }

    #[test]
    fn wildcard_allows_everyone() {
        let ch = WhatsAppChannel::new("tok".into(), "123".into(), "ver".into(), vec!["*".into()]);
        assert!(ch.is_number_allowed("+15550000000"));
    }

    #[test]
    fn empty_payload_yields_no_messages() {
        let ch = make_channel();
        assert!(ch.parse_webhook_payload(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn parses_a_text_message_and_strips_the_plus() {
        let ch = make_channel();
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "+923001234567",
                            "id": "wamid.abc",
                            "timestamp": "1699999999",
                            "type": "text",
                            "text": { "body": "2 large pepperoni please" }
                        }]
                    }
                }]
            }]
        });

        let msgs = ch.parse_webhook_payload(&payload);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].from, "923001234567");
        assert_eq!(msgs[0].text, "2 large pepperoni please");
        assert_eq!(msgs[0].id, "wamid.abc");
        assert_eq!(msgs[0].timestamp_ms, 1_699_999_999_000);
    }

    #[test]
    fn unauthorized_sender_is_dropped() {
        let ch = make_channel();
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "15550000000",
                            "id": "wamid.spam",
                            "type": "text",
                            "text": { "body": "free crypto" }
                        }]
                    }
                }]
            }]
        });

        assert!(ch.parse_webhook_payload(&payload).is_empty());
    }

    #[test]
    fn status_update_payload_yields_no_messages() {
        let ch = make_channel();
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "statuses": [{ "id": "wamid.abc", "status": "delivered" }]
                    }
                }]
            }]
        });

        assert!(ch.parse_webhook_payload(&payload).is_empty());
    }

    #[test]
    fn non_text_messages_are_skipped() {
        let ch = make_channel();
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "923001234567",
                            "id": "wamid.img",
                            "type": "image",
                            "image": { "id": "media-1" }
                        }]
                    }
                }]
            }]
        });

        assert!(ch.parse_webhook_payload(&payload).is_empty());
    }

    #[test]
    fn missing_message_id_gets_a_generated_one() {
        let ch = make_channel();
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "923001234567",
                            "type": "text",
                            "text": { "body": "hello" }
                        }]
                    }
                }]
            }]
        });

        let msgs = ch.parse_webhook_payload(&payload);
        assert_eq!(msgs.len(), 1);
        assert!(uuid::Uuid::parse_str(&msgs[0].id).is_ok());
    }

    #[tokio::test]
    async fn send_text_posts_the_graph_api_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123456789/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "923001234567",
                "type": "text",
                "text": { "body": "Your pizza is on the way! 🍕" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "wamid.out.1" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ch = make_channel().with_base_url(&server.uri());
        ch.send_text("+923001234567", "Your pizza is on the way! 🍕")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_text_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let ch = make_channel().with_base_url(&server.uri());
        let err = ch
            .send_text("923001234567", "hi")
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("401"));
        assert!(err.contains("invalid token"));
    }
}
