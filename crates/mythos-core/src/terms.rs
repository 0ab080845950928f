//! Significant-term extraction for free text.

use std::collections::BTreeMap;

/// Words too common to say anything about a need or a context.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "being",
    "but", "can", "could", "did", "does", "doing", "for", "from", "had", "has", "have", "her",
    "here", "him", "his", "how", "into", "its", "just", "like", "more", "most", "need", "needs",
    "not", "now", "off", "one", "only", "our", "out", "over", "really", "should", "some",
    "someone", "something", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "too", "under", "very", "want", "was", "way",
    "were", "what", "when", "where", "which", "while", "who", "why", "will", "with", "would",
    "you", "your",
];

/// Shortest word considered significant.
const MIN_TERM_LEN: usize = 3;

/// Lowercased significant words of `text`, in first-appearance order,
/// without repeats.
pub fn significant_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in words(text) {
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// The significant word appearing most often across `texts`.
///
/// Ties go to the alphabetically first word, so the answer depends only on
/// the input.
pub fn dominant_term<'a>(texts: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for text in texts {
        for word in words(text) {
            let count = counts.entry(word).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for (word, &count) in &counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((word, count));
        }
    }
    best.map(|(word, _)| word.clone())
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_TERM_LEN && !STOPWORDS.contains(&w.as_str()))
}
