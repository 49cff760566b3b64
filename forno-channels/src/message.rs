//! Channel-neutral inbound message shape.

use serde::{Deserialize, Serialize};

/// One text message lifted out of a webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform message id, or a generated v4 uuid when the payload
    /// carries none.
    pub id: String,
    /// Sender's phone number, digits only. Doubles as the session
    /// user id.
    pub from: String,
    /// Message body.
    pub text: String,
    /// Platform timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
}
