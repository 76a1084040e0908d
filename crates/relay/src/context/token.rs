//! Token estimation for context budgeting.
//!
//! Decides whether a document's full text fits the inline-context budget.
//! The default path is a deterministic subword heuristic; the `subword`
//! feature swaps in a real tokenizer, falling back to the heuristic when
//! the model file cannot be loaded. Estimation never fails.

/// Estimates the token count of a text for budget decisions.
///
/// The estimate only gates an optimization (inlining full text vs. sending
/// the document separately), so a consistent over-estimate is acceptable
/// and an error is not.
pub struct TokenEstimator {
    #[cfg(feature = "subword")]
    tokenizer: Option<tokenizers::Tokenizer>,
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "subword")]
            tokenizer: None,
        }
    }

    /// Load a tokenizer model file for exact counts. Failures are logged
    /// and the estimator keeps using the heuristic.
    #[cfg(feature = "subword")]
    pub fn with_model_file(path: &std::path::Path) -> Self {
        let tokenizer = match tokenizers::Tokenizer::from_file(path) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!("Failed to load tokenizer from {}: {e}", path.display());
                None
            }
        };
        Self { tokenizer }
    }

    /// Estimate the token count of `text`. Deterministic and monotone:
    /// appending text never lowers the estimate.
    pub fn estimate(&self, text: &str) -> usize {
        #[cfg(feature = "subword")]
        if let Some(tokenizer) = &self.tokenizer {
            match tokenizer.encode(text, false) {
                Ok(encoding) => return encoding.len(),
                Err(e) => tracing::debug!("Tokenizer encode failed, using heuristic: {e}"),
            }
        }
        Self::heuristic(text)
    }

    /// Whole text fits within `budget` tokens.
    pub fn fits(&self, text: &str, budget: usize) -> bool {
        self.estimate(text) <= budget
    }

    // Roughly one token per four characters, counted per word so that
    // whitespace runs do not inflate the estimate.
    fn heuristic(text: &str) -> usize {
        text.split_whitespace()
            .map(|word| word.chars().count().div_ceil(4))
            .sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(TokenEstimator::new().estimate(""), 0);
        assert_eq!(TokenEstimator::new().estimate("   \n\t "), 0);
    }

    #[test]
    fn short_words_count_one_token_each() {
        let est = TokenEstimator::new();
        assert_eq!(est.estimate("the cat sat"), 3);
    }

    #[test]
    fn long_words_split_into_subword_units() {
        let est = TokenEstimator::new();
        // 14 chars -> ceil(14/4) = 4
        assert_eq!(est.estimate("internationali"), 4);
    }

    #[test]
    fn estimate_is_monotone_under_append() {
        let est = TokenEstimator::new();
        let base = "a reasonably sized paragraph of text";
        let extended = format!("{base} with more words appended to it");
        assert!(est.estimate(&extended) >= est.estimate(base));
    }

    #[test]
    fn fits_respects_budget_boundary() {
        let est = TokenEstimator::new();
        let text = "one two three four";
        let n = est.estimate(text);
        assert!(est.fits(text, n));
        assert!(!est.fits(text, n - 1));
    }
}
