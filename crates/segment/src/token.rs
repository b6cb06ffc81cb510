//! Tokenization for lexical indexing and querying.
//!
//! The contract is intentionally narrow: lowercase, treat every character
//! outside `[A-Za-z0-9]` as a separator (non-ASCII letters included), split
//! on the separators, and drop a fixed English stop-word list. Index-time
//! and query-time tokenization must be the same function, so this module is
//! the only place the rules live.

/// Fixed English stop-word list excluded from tokenization.
///
/// The list is part of the index format: changing it changes every stored
/// term-frequency table, so additions require a snapshot rebuild.
pub const STOP_WORDS: [&str; 24] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Returns true when `token` is on the [`STOP_WORDS`] list.
///
/// Expects an already-lowercased token, which is what [`tokenize`] produces.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Split `text` into lowercase alphanumeric tokens with stop-words removed.
///
/// Every character outside ASCII `[a-z0-9]` (after lowercasing) acts as a
/// separator and is discarded; runs of separators collapse. Duplicate tokens
/// are preserved in input order so term-frequency accumulation works on the
/// raw output.
///
/// ```
/// use segment::tokenize;
///
/// let tokens = tokenize("The quick brown fox!");
/// assert_eq!(tokens, vec!["quick", "brown", "fox"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            flush_token(&mut tokens, &mut current);
        }
    }
    if !current.is_empty() {
        flush_token(&mut tokens, &mut current);
    }

    tokens
}

fn flush_token(tokens: &mut Vec<String>, current: &mut String) {
    if !is_stop_word(current.as_str()) {
        tokens.push(std::mem::take(current));
    } else {
        current.clear();
    }
}
