//! Deterministic intent and entity extraction.
//!
//! A pure function over turns: no model calls, no randomness, no state.
//! Given the same turns and vocabulary it always produces the same output,
//! which is what makes session summaries reproducible and testable.

use crate::types::{ExtractedEntities, Intent, Role, Turn};
use crate::vocabulary::{matches_term, tokenize, Vocabulary};

/// Output of [`extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Intents in first-seen order across the scanned turns, oldest first,
    /// each at most once
    pub intents: Vec<Intent>,
    pub entities: ExtractedEntities,
}

/// Scan user turns for intents and entities.
///
/// Only `role == user` turns contribute; assistant replies would otherwise
/// echo menu items back into the entity sets.
pub fn extract(turns: &[Turn], vocab: &Vocabulary) -> Extraction {
    let mut out = Extraction::default();

    for turn in turns.iter().filter(|t| t.role == Role::User) {
        let lower = turn.text.to_lowercase();
        let tokens = tokenize(&turn.text);

        let any = |words: &[String]| words.iter().any(|w| matches_term(&lower, &tokens, w));

        if any(&vocab.menu_words) {
            push_intent(&mut out.intents, Intent::SearchMenu);
        }
        if any(&vocab.order_words) {
            push_intent(&mut out.intents, Intent::CreateOrder);
        }
        if any(&vocab.status_words) {
            push_intent(&mut out.intents, Intent::OrderStatus);
        }
        if any(&vocab.info_words) {
            push_intent(&mut out.intents, Intent::AskInfo);
        }
        if any(&vocab.greeting_words) {
            push_intent(&mut out.intents, Intent::Greeting);
        }
        if vocab.is_confirmation(&turn.text) {
            push_intent(&mut out.intents, Intent::Confirmation);
        }

        for name in &vocab.item_names {
            if matches_term(&lower, &tokens, name) && !out.entities.mentioned_items.contains(name) {
                out.entities.mentioned_items.push(name.clone());
            }
        }

        for word in &vocab.preference_words {
            if matches_term(&lower, &tokens, word) && !out.entities.preferences.contains(word) {
                out.entities.preferences.push(word.clone());
            }
        }

        // Bare integer tokens in 1..=10; anything larger is a price, a phone
        // number, or an address fragment.
        for token in &tokens {
            if let Ok(n) = token.parse::<u32>() {
                if (1..=10).contains(&n) {
                    out.entities.quantities.push(n);
                }
            }
        }
    }

    out
}

fn push_intent(intents: &mut Vec<Intent>, intent: Intent) {
    if !intents.contains(&intent) {
        intents.push(intent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> Turn {
        Turn::new(Role::User, text)
    }

    fn assistant(text: &str) -> Turn {
        Turn::new(Role::Assistant, text)
    }

    #[test]
    fn test_order_turn_yields_quantity_preference_and_item() {
        let turns = vec![user("I want 2 large pepperoni pizzas")];
        let got = extract(&turns, &Vocabulary::default());

        assert!(got.intents.contains(&Intent::CreateOrder));
        assert!(got.entities.quantities.contains(&2));
        assert!(got.entities.preferences.contains(&"large".to_string()));
        assert!(got.entities.mentioned_items.contains(&"pepperoni".to_string()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let turns = vec![
            user("Salaam! Menu dikhao"),
            assistant("Here is our menu..."),
            user("2 large pepperoni aur 1 bbq chahiye"),
            user("haan book karo"),
        ];
        let vocab = Vocabulary::default();

        let a = extract(&turns, &vocab);
        let b = extract(&turns, &vocab);
        assert_eq!(a, b);
    }

    #[test]
    fn test_intents_dedup_in_first_seen_order() {
        let turns = vec![
            user("show me the menu"),
            user("I want a pepperoni pizza"),
            user("actually show the menu again"),
        ];
        let got = extract(&turns, &Vocabulary::default());

        let first_menu = got.intents.iter().position(|i| *i == Intent::SearchMenu);
        let first_order = got.intents.iter().position(|i| *i == Intent::CreateOrder);
        assert_eq!(first_menu, Some(0));
        assert!(first_order > first_menu);
        assert_eq!(
            got.intents.iter().filter(|i| **i == Intent::SearchMenu).count(),
            1
        );
    }

    #[test]
    fn test_assistant_turns_do_not_contribute() {
        let turns = vec![
            assistant("We have pepperoni, bbq and veggie pizzas for 3 sizes"),
            user("hello"),
        ];
        let got = extract(&turns, &Vocabulary::default());

        assert!(got.entities.mentioned_items.is_empty());
        assert!(got.entities.quantities.is_empty());
        assert_eq!(got.intents, vec![Intent::Greeting]);
    }

    #[test]
    fn test_out_of_range_numbers_dropped() {
        let turns = vec![user("call me at 0301 1234567, send 2 pizzas worth 1500")];
        let got = extract(&turns, &Vocabulary::default());

        assert_eq!(got.entities.quantities, vec![2]);
    }

    #[test]
    fn test_confirmation_intent_uses_substring_match() {
        let turns = vec![user("theek hai, book karo")];
        let got = extract(&turns, &Vocabulary::default());

        assert!(got.intents.contains(&Intent::Confirmation));
    }

    #[test]
    fn test_empty_turns_empty_extraction() {
        let got = extract(&[], &Vocabulary::default());
        assert!(got.intents.is_empty());
        assert!(got.entities.is_empty());
    }
}
