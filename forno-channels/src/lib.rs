//! Messaging channels for the Forno assistant.
//!
//! Currently one channel: WhatsApp Business Cloud. The channel layer is
//! transport only. It verifies webhooks, lifts text messages out of
//! webhook payloads, and sends replies through the Graph API; what to
//! reply is someone else's job.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod format;
pub mod message;
pub mod whatsapp;

pub use format::clean_for_whatsapp;
pub use message::InboundMessage;
pub use whatsapp::WhatsAppChannel;
