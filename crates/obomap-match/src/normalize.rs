//! Text normalization shared by the string and similarity matchers.
//!
//! [`normalize`] is the exact-match key. [`tokens`] additionally removes
//! English stopwords and folds plurals; it feeds TF-IDF fitting and query
//! vectorization, which must tokenize identically.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing qualifier such as "(disorder)" or "[Ambiguous]".
static TRAILING_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(\([^()]*\)|\[[^\[\]]*\])\s*$").expect("valid regex"));

/// Runs of anything that is not a letter or digit.
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

/// English stopwords removed before TF-IDF tokenization.
///
/// Contracted forms are listed split on the apostrophe, matching how they
/// look after punctuation is stripped.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
        "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
        "for", "with", "about", "against", "between", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
        "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
        "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
        "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
        "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
        "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
    ]
    .into_iter()
    .collect()
});

/// Normalize a label or synonym for exact comparison.
///
/// Lowercases, strips trailing parenthetical/bracketed qualifiers, replaces
/// punctuation with spaces, and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let mut lowered = text.trim().to_lowercase();
    loop {
        let stripped = TRAILING_QUALIFIER.replace(&lowered, "");
        // A string that is nothing but a qualifier keeps its content.
        if stripped.len() == lowered.len() || stripped.trim().is_empty() {
            break;
        }
        lowered = stripped.into_owned();
    }
    NON_ALPHANUMERIC
        .replace_all(&lowered, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Fold simple English plurals to their singular form.
pub fn fold_plural(word: &str) -> String {
    let len = word.len();
    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..len - 3]);
    }
    if len > 4 && (word.ends_with("sses") || word.ends_with("xes") || word.ends_with("ches")) {
        return word[..len - 2].to_string();
    }
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..len - 1].to_string();
    }
    word.to_string()
}

/// Tokenize a string for TF-IDF: normalize, drop stopwords, fold plurals.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|w| !w.is_empty() && !is_stopword(w))
        .map(fold_plural)
        .collect()
}
