use crate::error::{Error, Result};

pub const DEFAULT_K1: f64 = 1.2;
pub const DEFAULT_B: f64 = 0.75;

/// Document-length-normalized term relevance (§4.4). A scorer is built once
/// per query execution against the corpus statistics the query sees
/// (`total_docs`, `avg_doc_len`); per-(term, doc) scores are obtained by
/// calling [`Bm25Scorer::score`] and summed by the caller over query terms.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    total_docs: u64,
    avg_doc_len: f64,
    k1: f64,
    b: f64,
}

impl Bm25Scorer {
    pub fn new(total_docs: u64, avg_doc_len: f64, k1: f64, b: f64) -> Result<Self> {
        if avg_doc_len < 0.0 {
            return Err(Error::InvalidParameter(format!("avgDocLength must be >= 0, got {avg_doc_len}")));
        }
        Ok(Bm25Scorer { total_docs, avg_doc_len, k1, b })
    }

    pub fn with_defaults(total_docs: u64, avg_doc_len: f64) -> Result<Self> {
        Self::new(total_docs, avg_doc_len, DEFAULT_K1, DEFAULT_B)
    }

    /// `score(t,d)` for a single term against a single document, given its
    /// term frequency, document frequency, and document length. Returns
    /// `0` for every degenerate input named in §4.4's edge-case table.
    pub fn score(&self, tf: u32, df: u32, doc_len: u32) -> f64 {
        if tf == 0 || df == 0 || doc_len == 0 || self.total_docs == 0 || self.avg_doc_len == 0.0 {
            return 0.0;
        }
        let (n, df, tf, doc_len) = (self.total_docs as f64, df as f64, tf as f64, doc_len as f64);
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        let norm = (1.0 - self.b) + self.b * (doc_len / self.avg_doc_len);
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_avg_doc_length() {
        assert!(Bm25Scorer::new(10, -1.0, DEFAULT_K1, DEFAULT_B).is_err());
    }

    #[test]
    fn zero_avg_doc_length_scores_zero() {
        let scorer = Bm25Scorer::with_defaults(10, 0.0).unwrap();
        assert_eq!(scorer.score(3, 2, 5), 0.0);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        let scorer = Bm25Scorer::with_defaults(10, 5.0).unwrap();
        assert_eq!(scorer.score(0, 2, 5), 0.0);
        assert_eq!(scorer.score(3, 0, 5), 0.0);
        assert_eq!(scorer.score(3, 2, 0), 0.0);
        let empty = Bm25Scorer::with_defaults(0, 5.0).unwrap();
        assert_eq!(empty.score(3, 2, 5), 0.0);
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let scorer = Bm25Scorer::with_defaults(2, 2.0).unwrap();
        let low = scorer.score(1, 1, 2);
        let high = scorer.score(3, 1, 2);
        assert!(high > low);
        assert!(low > 0.0);
    }

    #[test]
    fn equal_tf_and_doc_len_score_equally() {
        let scorer = Bm25Scorer::with_defaults(5, 4.0).unwrap();
        let a = scorer.score(2, 3, 4);
        let b = scorer.score(2, 3, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn k1_zero_degenerates_toward_binary_idf() {
        let scorer = Bm25Scorer::new(10, 4.0, 0.0, DEFAULT_B).unwrap();
        let one = scorer.score(1, 2, 4);
        let many = scorer.score(50, 2, 4);
        assert!((one - many).abs() < 1e-9, "tf should stop mattering once k1 is 0");
    }

    #[test]
    fn b_zero_ignores_length_normalization() {
        let scorer = Bm25Scorer::new(10, 4.0, DEFAULT_K1, 0.0).unwrap();
        let short = scorer.score(3, 2, 1);
        let long = scorer.score(3, 2, 100);
        assert_eq!(short, long);
    }
}
