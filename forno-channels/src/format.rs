//! Outbound text cleanup for the WhatsApp client.
//!
//! Replies are composed in light markdown for the web client. WhatsApp
//! renders `**bold**` and backtick spans as literal characters, so the
//! markers are stripped before sending. Emoji and line structure pass
//! through untouched.

use regex::Regex;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`(.*?)`").unwrap());

/// Strip markdown markers that WhatsApp shows verbatim.
pub fn clean_for_whatsapp(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    CODE.replace_all(&text, "$1").into_owned()
}
