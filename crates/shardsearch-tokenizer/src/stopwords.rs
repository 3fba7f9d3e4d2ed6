use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// English stop words, roughly the set most analyzers ship with. Kept small
/// and hand-picked rather than imported wholesale: the set is mutable at
/// runtime (`add`/`remove`/`auto_detect`) so the starting list only needs to
/// be reasonable, not exhaustive.
const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "me", "my",
    "nor", "not", "of", "on", "or", "our", "ours", "she", "so", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "to", "too", "us", "was",
    "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "you", "your",
    "yours",
];

pub const DEFAULT_AUTO_DETECT_THRESHOLD: u64 = 1000;

/// Mutable, process-wide set of lowercased stop-word forms with a
/// frequency-driven auto-detect (§4.1).
pub struct Stopwords {
    words: RwLock<HashSet<String>>,
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwords {
    pub fn new() -> Self {
        let words = DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect();
        Stopwords { words: RwLock::new(words) }
    }

    pub fn empty() -> Self {
        Stopwords { words: RwLock::new(HashSet::new()) }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.words.read().contains(term)
    }

    pub fn add(&self, term: impl Into<String>) {
        self.words.write().insert(term.into().to_lowercase());
    }

    pub fn remove(&self, term: &str) {
        self.words.write().remove(&term.to_lowercase());
    }

    pub fn snapshot(&self) -> HashSet<String> {
        self.words.read().clone()
    }

    /// Promotes any term whose observed frequency is at or above
    /// `threshold` into the stop-word set. Returns the terms that were
    /// newly added.
    pub fn auto_detect(&self, term_freq: &HashMap<String, u64>, threshold: u64) -> Vec<String> {
        let mut added = Vec::new();
        let mut words = self.words.write();
        for (term, freq) in term_freq {
            if *freq >= threshold && words.insert(term.to_lowercase()) {
                added.push(term.clone());
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_contains_common_words() {
        let sw = Stopwords::new();
        assert!(sw.contains("the"));
        assert!(sw.contains("and"));
        assert!(!sw.contains("search"));
    }

    #[test]
    fn auto_detect_promotes_frequent_terms() {
        let sw = Stopwords::empty();
        let mut freq = HashMap::new();
        freq.insert("widget".to_string(), 1200);
        freq.insert("rare".to_string(), 3);
        let added = sw.auto_detect(&freq, DEFAULT_AUTO_DETECT_THRESHOLD);
        assert_eq!(added, vec!["widget".to_string()]);
        assert!(sw.contains("widget"));
        assert!(!sw.contains("rare"));
    }
}
