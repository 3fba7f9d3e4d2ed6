use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use shardsearch_types::FieldType;

use crate::error::{Error, Result};

/// The named tokenization strategies of §4.1. Unknown names degrade to
/// [`Analyzer::Standard`] — tokenization never fails on a bad analyzer name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Analyzer {
    Standard,
    Simple,
    Whitespace,
    Keyword,
    Pattern,
    Email,
    Url,
    Phone,
    Custom(CustomAnalyzerConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAnalyzerConfig {
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_true")]
    pub remove_stopwords: bool,
    #[serde(default)]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub preserve_hyphens: bool,
    #[serde(default)]
    pub preserve_apostrophes: bool,
    #[serde(default)]
    pub custom_pattern: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_length() -> usize {
    usize::MAX
}

impl Default for CustomAnalyzerConfig {
    fn default() -> Self {
        CustomAnalyzerConfig {
            lowercase: true,
            remove_stopwords: true,
            min_length: 0,
            max_length: usize::MAX,
            preserve_hyphens: false,
            preserve_apostrophes: false,
            custom_pattern: None,
        }
    }
}

impl CustomAnalyzerConfig {
    /// Validates the config and compiles its pattern, per the
    /// `InvalidParameter` row of §7: a bad custom analyzer configuration
    /// fails at construction rather than silently misbehaving.
    fn compiled_pattern(&self) -> Result<Regex> {
        if self.min_length > self.max_length {
            return Err(Error::InvalidParameter(format!(
                "minLength ({}) must be <= maxLength ({})",
                self.min_length, self.max_length
            )));
        }
        let pattern = match &self.custom_pattern {
            Some(p) => p.clone(),
            None => {
                let mut class = String::from(r"\w");
                if self.preserve_hyphens {
                    class.push('-');
                }
                if self.preserve_apostrophes {
                    class.push('\'');
                }
                format!("[{class}]+")
            }
        };
        Regex::new(&pattern).map_err(|e| Error::InvalidParameter(format!("bad customPattern: {e}")))
    }
}

/// Parses an analyzer name coming from field configuration into an
/// [`Analyzer`]. Anything unrecognized degrades to `standard` (§4.1:
/// "malformed analyzer names degrade to standard").
pub fn analyzer_by_name(name: &str) -> Analyzer {
    match name {
        "simple" => Analyzer::Simple,
        "whitespace" => Analyzer::Whitespace,
        "keyword" => Analyzer::Keyword,
        "pattern" => Analyzer::Pattern,
        "email" => Analyzer::Email,
        "url" => Analyzer::Url,
        "phone" => Analyzer::Phone,
        _ => Analyzer::Standard,
    }
}

/// The default analyzer used for `match{field:"*"}` token extraction and for
/// per-field-type indexing, chosen by the field's semantic type.
pub fn analyzer_for_field_type(ty: FieldType) -> Analyzer {
    match ty {
        FieldType::Email => Analyzer::Email,
        FieldType::Url => Analyzer::Url,
        FieldType::Phone => Analyzer::Phone,
        FieldType::Keyword => Analyzer::Keyword,
        _ => Analyzer::Standard,
    }
}

static WORD_CHAR_KEEP_DASH_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.]+").unwrap());
static DASH_DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-.]+").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").unwrap());
static PATTERN_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\w'-]+\b").unwrap());
static EMAIL_HIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static URL_HIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://[^\s]+").unwrap());
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// `tokenize(text, analyzer) → ordered sequence of tokens` (§4.1 contract).
/// Non-string or empty input is handled by the caller passing `""`, which
/// always yields an empty sequence. Never panics: an analyzer is always
/// applicable, and regex construction for `custom` is validated ahead of
/// time by [`CustomAnalyzerConfig::compiled_pattern`].
pub fn tokenize(text: &str, analyzer: &Analyzer, stopwords: &crate::Stopwords) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    match analyzer {
        Analyzer::Standard => tokenize_standard(text, stopwords),
        Analyzer::Simple => tokenize_simple(text, stopwords),
        Analyzer::Whitespace => tokenize_whitespace(text, stopwords),
        Analyzer::Keyword => tokenize_keyword(text),
        Analyzer::Pattern => tokenize_pattern(text, stopwords),
        Analyzer::Email => tokenize_email(text),
        Analyzer::Url => tokenize_url(text),
        Analyzer::Phone => tokenize_phone(text),
        Analyzer::Custom(cfg) => tokenize_custom(text, cfg, stopwords),
    }
}

fn tokenize_standard(text: &str, stopwords: &crate::Stopwords) -> Vec<String> {
    let lower = text.to_lowercase();
    // Non-word chars other than `-`/`.` become spaces; this is also what
    // strips apostrophes, so "don't" -> "don t" and "cat's" -> "cat s": the
    // single-character-token filter below then drops the bare "t"/"s",
    // which is exactly the contraction/possessive behavior the analyzer
    // promises without needing bespoke apostrophe handling.
    let spaced = WORD_CHAR_KEEP_DASH_DOT.replace_all(&lower, " ");
    let collapsed = DASH_DOT_RUNS.replace_all(&spaced, " ");
    let normalized = WHITESPACE_RUNS.replace_all(collapsed.trim(), " ");
    normalized
        .split(' ')
        .filter(|t| !t.is_empty() && t.chars().count() > 1 && !stopwords.contains(t))
        .map(|t| t.to_string())
        .collect()
}

fn tokenize_simple(text: &str, stopwords: &crate::Stopwords) -> Vec<String> {
    let lower = text.to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, "");
    stripped
        .split_whitespace()
        .filter(|t| !t.is_empty() && !stopwords.contains(t))
        .map(|t| t.to_string())
        .collect()
}

fn tokenize_whitespace(text: &str, stopwords: &crate::Stopwords) -> Vec<String> {
    text.split_whitespace()
        .filter(|t| !stopwords.contains(&t.to_lowercase()))
        .map(|t| t.to_string())
        .collect()
}

fn tokenize_keyword(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    }
}

fn tokenize_pattern(text: &str, stopwords: &crate::Stopwords) -> Vec<String> {
    PATTERN_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 1 && !stopwords.contains(t))
        .collect()
}

fn tokenize_email(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for hit in EMAIL_HIT.find_iter(text) {
        let hit = hit.as_str().to_lowercase();
        if let Some((local, domain)) = hit.split_once('@') {
            push_unique(&mut out, local.to_string());
            push_unique(&mut out, domain.to_string());
            for label in domain.split('.') {
                if label.chars().count() >= 2 {
                    push_unique(&mut out, label.to_string());
                }
            }
        }
    }
    out
}

fn tokenize_url(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for hit in URL_HIT.find_iter(text) {
        let hit = hit.as_str().to_lowercase();
        let without_scheme = hit.splitn(2, "://").nth(1).unwrap_or("");
        let (authority, path) = match without_scheme.split_once('/') {
            Some((a, p)) => (a, p),
            None => (without_scheme, ""),
        };
        let host = authority.split(['?', '#']).next().unwrap_or(authority);
        if !host.is_empty() {
            push_unique(&mut out, host.to_string());
            for label in host.split('.') {
                if !label.is_empty() {
                    push_unique(&mut out, label.to_string());
                }
            }
        }
        for segment in path.split(['/', '?', '#']) {
            if segment.chars().count() >= 2 {
                push_unique(&mut out, segment.to_string());
            }
        }
    }
    out
}

fn tokenize_phone(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut all_digits = String::new();
    for m in DIGIT_RUN.find_iter(text) {
        let run = m.as_str();
        all_digits.push_str(run);
        push_unique(&mut out, run.to_string());
        if run.len() >= 10 {
            push_unique(&mut out, run[..3].to_string());
        }
        if run.len() >= 3 {
            for window in run.as_bytes().windows(3) {
                push_unique(&mut out, String::from_utf8_lossy(window).to_string());
            }
        }
    }
    if !all_digits.is_empty() {
        push_unique(&mut out, all_digits);
    }
    out
}

fn tokenize_custom(text: &str, cfg: &CustomAnalyzerConfig, stopwords: &crate::Stopwords) -> Vec<String> {
    let pattern = match cfg.compiled_pattern() {
        Ok(p) => p,
        Err(_) => return tokenize_standard(text, stopwords),
    };
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .map(|t| if cfg.lowercase { t.to_lowercase() } else { t })
        .filter(|t| {
            let len = t.chars().count();
            len >= cfg.min_length
                && len <= cfg.max_length
                && !(cfg.remove_stopwords && stopwords.contains(&t.to_lowercase()))
        })
        .collect()
}

fn push_unique(out: &mut Vec<String>, token: String) {
    if !out.contains(&token) {
        out.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stopwords;

    #[test]
    fn standard_drops_stopwords_and_single_chars() {
        let sw = Stopwords::new();
        let tokens = tokenize("Don't worry, be happy!", &Analyzer::Standard, &sw);
        assert_eq!(tokens, vec!["don", "worry", "happy"]);
    }

    #[test]
    fn standard_possessive() {
        let sw = Stopwords::new();
        assert_eq!(tokenize("cat's toy", &Analyzer::Standard, &sw), vec!["cat", "toy"]);
        assert_eq!(tokenize("cats' toy", &Analyzer::Standard, &sw), vec!["cats", "toy"]);
    }

    #[test]
    fn keyword_is_one_token_or_none() {
        let sw = Stopwords::empty();
        assert_eq!(tokenize("  Exact Value  ", &Analyzer::Keyword, &sw), vec!["Exact Value"]);
        assert_eq!(tokenize("   ", &Analyzer::Keyword, &sw), Vec::<String>::new());
    }

    #[test]
    fn whitespace_preserves_case_and_punctuation() {
        let sw = Stopwords::new();
        let tokens = tokenize("Hello, World!", &Analyzer::Whitespace, &sw);
        assert_eq!(tokens, vec!["Hello,", "World!"]);
    }

    #[test]
    fn email_analyzer_extracts_parts() {
        let sw = Stopwords::empty();
        let tokens = tokenize("contact Jane@Example.CO.UK today", &Analyzer::Email, &sw);
        assert_eq!(tokens, vec!["jane", "example.co.uk", "example", "co", "uk"]);
    }

    #[test]
    fn url_analyzer_extracts_host_labels_and_path() {
        let sw = Stopwords::empty();
        let tokens = tokenize("see https://Docs.Example.com/guide/intro?x=1", &Analyzer::Url, &sw);
        assert!(tokens.contains(&"docs.example.com".to_string()));
        assert!(tokens.contains(&"docs".to_string()));
        assert!(tokens.contains(&"example".to_string()));
        assert!(tokens.contains(&"guide".to_string()));
        assert!(tokens.contains(&"intro".to_string()));
    }

    #[test]
    fn phone_analyzer_windows_and_concatenation() {
        let sw = Stopwords::empty();
        let tokens = tokenize("call 415-555-2671", &Analyzer::Phone, &sw);
        assert!(tokens.contains(&"4155552671".to_string()));
        assert!(tokens.contains(&"415".to_string()));
        assert!(tokens.contains(&"555".to_string()));
    }

    #[test]
    fn unknown_analyzer_name_degrades_to_standard() {
        assert!(matches!(analyzer_by_name("bogus"), Analyzer::Standard));
    }

    #[test]
    fn custom_analyzer_respects_length_bounds() {
        let sw = Stopwords::empty();
        let cfg = CustomAnalyzerConfig { min_length: 3, max_length: 5, ..Default::default() };
        let tokens = tokenize_custom("a bb ccc dddd eeeee ffffff", &cfg, &sw);
        assert_eq!(tokens, vec!["ccc", "dddd", "eeeee"]);
    }

    #[test]
    fn custom_analyzer_rejects_bad_length_bounds_at_construction() {
        let cfg = CustomAnalyzerConfig { min_length: 10, max_length: 2, ..Default::default() };
        assert!(cfg.compiled_pattern().is_err());
    }
}
