//! Keyword vocabularies for intent, entity, and language detection.
//!
//! All detection in this crate is plain keyword/pattern matching, so the word
//! lists are configuration data rather than hidden constants: construct a
//! [`Vocabulary`] (or deserialize one) and hand it to the extractor to extend
//! or replace any list.
//!
//! Matching rules:
//! - single-word terms match whole tokens (text split on non-alphanumerics)
//! - multi-word terms match as case-insensitive substrings
//! - confirmation terms always match as substrings, mirroring the shipped
//!   product behavior ("ok" fires inside "okay" - and inside other words;
//!   known over-match, kept until product decides on stricter rules)

use serde::{Deserialize, Serialize};

/// Keyword lists driving the deterministic extraction layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Menu-browsing words (`search_menu` intent)
    #[serde(default = "default_menu_words")]
    pub menu_words: Vec<String>,

    /// Order-placing words (`create_order` intent)
    #[serde(default = "default_order_words")]
    pub order_words: Vec<String>,

    /// Order-tracking words (`order_status` intent)
    #[serde(default = "default_status_words")]
    pub status_words: Vec<String>,

    /// Store/policy question words (`ask_info` intent)
    #[serde(default = "default_info_words")]
    pub info_words: Vec<String>,

    /// Greeting words (`greeting` intent)
    #[serde(default = "default_greeting_words")]
    pub greeting_words: Vec<String>,

    /// Affirmative words that confirm a pending order
    #[serde(default = "default_confirmation_words")]
    pub confirmation_words: Vec<String>,

    /// Known menu item-name fragments (`mentioned_items` entities)
    #[serde(default = "default_item_names")]
    pub item_names: Vec<String>,

    /// Size and dietary/spice words (`preferences` entities)
    #[serde(default = "default_preference_words")]
    pub preference_words: Vec<String>,

    /// Roman-Urdu function words (question words, yes/no words, pronouns,
    /// imperative verbs) for the language heuristic
    #[serde(default = "default_romanized_function_words")]
    pub romanized_function_words: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            menu_words: default_menu_words(),
            order_words: default_order_words(),
            status_words: default_status_words(),
            info_words: default_info_words(),
            greeting_words: default_greeting_words(),
            confirmation_words: default_confirmation_words(),
            item_names: default_item_names(),
            preference_words: default_preference_words(),
            romanized_function_words: default_romanized_function_words(),
        }
    }
}

impl Vocabulary {
    /// True if the message contains any confirmation word.
    ///
    /// Substring containment on the lowercased text - a confirming message
    /// can carry other content too ("haan book karo please").
    pub fn is_confirmation(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.confirmation_words.iter().any(|w| lower.contains(w.as_str()))
    }
}

/// Split lowercased text into alphanumeric tokens.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Match one vocabulary term against pre-lowercased text and its tokens.
pub(crate) fn matches_term(lower_text: &str, tokens: &[String], term: &str) -> bool {
    if term.contains(' ') {
        lower_text.contains(term)
    } else {
        tokens.iter().any(|t| t == term)
    }
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_menu_words() -> Vec<String> {
    strings(&["menu", "pizza", "pizzas", "options", "price", "prices", "show", "dikhao"])
}

fn default_order_words() -> Vec<String> {
    strings(&["order", "want", "buy", "book", "chahiye", "bhook", "hungry", "lelo", "krdo"])
}

fn default_status_words() -> Vec<String> {
    strings(&["status", "track", "tracking", "kahan", "where is my order"])
}

fn default_info_words() -> Vec<String> {
    strings(&[
        "hours",
        "timing",
        "timings",
        "open",
        "refund",
        "policy",
        "payment",
        "allergy",
        "allergens",
        "halal",
        "how long",
        "delivery time",
        "kitna",
        "kitne",
    ])
}

fn default_greeting_words() -> Vec<String> {
    strings(&[
        "hi",
        "hello",
        "hey",
        "salam",
        "salaam",
        "assalam",
        "namaste",
        "thanks",
        "thank you",
        "shukriya",
    ])
}

fn default_confirmation_words() -> Vec<String> {
    strings(&[
        "yes", "haan", "ha", "confirm", "ok", "okay", "theek hai", "acha", "sure", "book karo",
        "karo",
    ])
}

fn default_item_names() -> Vec<String> {
    strings(&[
        "pepperoni",
        "margherita",
        "hawaiian",
        "veggie",
        "bbq",
        "chicken tikka",
        "tikka",
        "fajita",
        "meat lovers",
        "cheese",
        "mushroom",
        "peri peri",
        "garlic bread",
        "wings",
    ])
}

fn default_preference_words() -> Vec<String> {
    strings(&[
        "small",
        "medium",
        "large",
        "family",
        "spicy",
        "mild",
        "vegetarian",
        "veg",
        "halal",
        "cheesy",
        "extra cheese",
        "thin crust",
        "stuffed crust",
    ])
}

fn default_romanized_function_words() -> Vec<String> {
    strings(&[
        // question words
        "kya", "kyun", "kab", "kahan", "kaise", "kitna", "kitne", "kaun",
        // yes/no
        "haan", "han", "nahi", "nai", "ji",
        // pronouns
        "mujhe", "mera", "meri", "apna", "aap", "tum",
        // imperative verbs
        "karo", "krdo", "dikhao", "batao", "bhejo", "dedo", "lelo", "dijiye", "chahiye",
    ])
}
