//! Roman-Urdu language heuristic.
//!
//! The assistant answers in whichever language the user writes. Detecting
//! romanized Urdu from Latin script is done with a closed list of function
//! words; content words ("pizza", "order") are shared across both languages
//! and tell us nothing.

use crate::types::LanguageHint;
use crate::vocabulary::{tokenize, Vocabulary};

/// How many distinct function words must appear before a message counts as
/// romanized. A single hit is too weak: several entries collide with English
/// words ("ha", "ji" inside names, ...).
const MIN_DISTINCT_HITS: usize = 2;

/// Tag a message as `english` or `romanized`.
///
/// A message is `romanized` iff at least [`MIN_DISTINCT_HITS`] distinct words
/// from the function-word vocabulary appear as whole tokens.
pub fn detect_language(text: &str, vocab: &Vocabulary) -> LanguageHint {
    let tokens = tokenize(text);

    let mut hits: Vec<&str> = Vec::new();
    for word in &vocab.romanized_function_words {
        if tokens.iter().any(|t| t == word) && !hits.contains(&word.as_str()) {
            hits.push(word);
            if hits.len() >= MIN_DISTINCT_HITS {
                return LanguageHint::Romanized;
            }
        }
    }

    LanguageHint::English
}
