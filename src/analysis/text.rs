//! Text primitives shared by the analysis stages.
//!
//! All matching runs on lowercased text. How a configured term is located is
//! decided by [`MatchPolicy`]; tokenization for trend extraction is always
//! word based.

use crate::config::MatchPolicy;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").unwrap());

/// Suffixes tolerated after a term under [`MatchPolicy::WordBoundary`].
const INFLECTIONS: [&str; 4] = ["s", "es", "ed", "ing"];

pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was",
        "one", "our", "out", "with", "this", "that", "have", "from", "they", "will", "would",
        "there", "their", "what", "which", "when", "make", "like", "into", "year", "your",
        "just", "over", "also", "such", "because", "these", "first", "being", "after", "most",
        "than", "said", "has", "been", "were", "its", "his", "she", "him", "them", "says",
        "say", "new", "time", "amid", "who", "more", "about", "while", "where", "other",
    ]
    .into_iter()
    .collect()
});

pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

fn ends_on_boundary(rest: &str) -> bool {
    rest.chars().next().is_none_or(|c| !is_word_char(c))
}

fn boundary_match_at(text: &str, start: usize, term: &str) -> bool {
    if text[..start].chars().next_back().is_some_and(is_word_char) {
        return false;
    }
    let rest = &text[start + term.len()..];
    ends_on_boundary(rest)
        || INFLECTIONS
            .iter()
            .any(|suffix| rest.strip_prefix(suffix).is_some_and(ends_on_boundary))
}

/// Byte offset of the first occurrence of `term` in `text` under `policy`.
///
/// Both arguments are expected to be lowercased already.
pub fn find_term(text: &str, term: &str, policy: MatchPolicy) -> Option<usize> {
    if term.is_empty() {
        return None;
    }
    match policy {
        MatchPolicy::Substring => text.find(term),
        MatchPolicy::WordBoundary => text
            .match_indices(term)
            .map(|(start, _)| start)
            .find(|&start| boundary_match_at(text, start, term)),
    }
}

pub fn contains_term(text: &str, term: &str, policy: MatchPolicy) -> bool {
    find_term(text, term, policy).is_some()
}

/// Terms present in `text`, ordered by first appearance, each listed once.
pub fn matched_terms<'a>(text: &str, terms: &'a [String], policy: MatchPolicy) -> Vec<&'a str> {
    let mut found: Vec<(usize, usize, &'a str)> = terms
        .iter()
        .enumerate()
        .filter_map(|(i, term)| find_term(text, term, policy).map(|pos| (pos, i, term.as_str())))
        .collect();
    found.sort_by_key(|&(pos, i, _)| (pos, i));
    let mut seen = HashSet::new();
    found
        .into_iter()
        .map(|(_, _, term)| term)
        .filter(|term| seen.insert(*term))
        .collect()
}

/// Number of distinct terms from `terms` present in `text`.
pub fn count_distinct(text: &str, terms: &[String], policy: MatchPolicy) -> usize {
    terms
        .iter()
        .filter(|term| contains_term(text, term, policy))
        .count()
}

/// Lowercase letter-only words in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    let lower = normalize(text);
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Byte spans of sentences in `text`. A sentence ends at terminal punctuation
/// (`.`, `!`, `?`) followed by whitespace or the end of the text; the span
/// includes the punctuation. Trailing text without punctuation is a final span.
pub fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if matches!(c, '.' | '!' | '?') {
            let next = chars.peek().map(|&(_, n)| n);
            if next.is_none_or(char::is_whitespace) {
                if let Some(s) = start.take() {
                    spans.push((s, i + c.len_utf8()));
                }
            }
        }
    }
    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            spans.push((s, end));
        }
    }
    spans
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text)
        .into_iter()
        .map(|(s, e)| &text[s..e])
        .collect()
}
