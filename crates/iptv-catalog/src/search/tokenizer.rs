//! Search tokenization
//!
//! Case-fold, fold diacritics, split on non-alphanumeric boundaries, and
//! index both the raw token and a lightly stemmed form so "running" matches
//! "run". The same rules apply to documents and queries.

use crate::grouping::normalize::fold_diacritics;

/// Lightly stem one token: strip a trailing "s"/"ing"/"ed" and collapse a
/// trailing doubled consonant ("runn" → "run"). Returns the token unchanged
/// when no rule applies.
pub fn stem(token: &str) -> String {
    let stripped = if token.len() > 5 && token.ends_with("ing") {
        Some(&token[..token.len() - 3])
    } else if token.len() > 4 && token.ends_with("ed") {
        Some(&token[..token.len() - 2])
    } else if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        Some(&token[..token.len() - 1])
    } else {
        None
    };

    let Some(stripped) = stripped else {
        return token.to_string();
    };

    // Collapse the doubled consonant a stripped suffix exposes
    let mut chars = stripped.chars().rev();
    if let (Some(last), Some(before)) = (chars.next(), chars.next()) {
        if last == before && last.is_ascii_alphabetic() && !"aeiou".contains(last) {
            return stripped[..stripped.len() - last.len_utf8()].to_string();
        }
    }
    stripped.to_string()
}

/// Tokenize document text into raw + stemmed index tokens
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold_diacritics(&text.to_lowercase());
    let mut tokens = Vec::new();

    for raw in folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        tokens.push(raw.to_string());
        let stemmed = stem(raw);
        if stemmed != raw {
            tokens.push(stemmed);
        }
    }

    tokens
}

/// One query term with its stemmed variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub raw: String,
    pub stemmed: String,
}

/// Split free text into query terms
pub fn query_terms(text: &str) -> Vec<QueryTerm> {
    let folded = fold_diacritics(&text.to_lowercase());
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|raw| QueryTerm {
            raw: raw.to_string(),
            stemmed: stem(raw),
        })
        .collect()
}
