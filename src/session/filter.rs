//! Utterance filtering
//!
//! Continuous recognition engines emit noise: empty fragments, low-confidence
//! guesses, and repeats of an unchanged result. This filter is the sole
//! defense between the recognizer and the remote responder.

use crate::config::FilterConfig;

/// Decision for one raw recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forward to the responder; carries the normalized (trimmed) text
    Accepted(String),
    /// Normalized text is shorter than the minimum
    TooShort,
    /// Confidence below the threshold
    LowConfidence,
    /// Exact repeat of the previously accepted utterance
    Duplicate,
}

/// Applies the acceptance rules to raw recognition results
///
/// The filter itself is stateless; the remembered last-accepted utterance
/// lives in session state and is passed in per call.
#[derive(Debug, Clone)]
pub struct UtteranceFilter {
    min_chars: usize,
    min_confidence: f32,
}

impl UtteranceFilter {
    /// Build a filter from configuration thresholds
    #[must_use]
    pub const fn new(config: &FilterConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            min_confidence: config.min_confidence,
        }
    }

    /// Evaluate one raw result. Rules apply in order: length, confidence,
    /// duplicate. A missing confidence score is trusted as full confidence.
    #[must_use]
    pub fn evaluate(
        &self,
        raw: &str,
        confidence: Option<f32>,
        last_accepted: Option<&str>,
    ) -> Verdict {
        let text = raw.trim();

        if text.chars().count() < self.min_chars {
            return Verdict::TooShort;
        }

        if confidence.unwrap_or(1.0) < self.min_confidence {
            return Verdict::LowConfidence;
        }

        if last_accepted == Some(text) {
            return Verdict::Duplicate;
        }

        Verdict::Accepted(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UtteranceFilter {
        UtteranceFilter::new(&FilterConfig::default())
    }

    #[test]
    fn short_results_are_rejected() {
        assert_eq!(filter().evaluate("hi", Some(0.9), None), Verdict::TooShort);
        assert_eq!(filter().evaluate("", None, None), Verdict::TooShort);
        assert_eq!(filter().evaluate("  a  ", Some(1.0), None), Verdict::TooShort);
    }

    #[test]
    fn low_confidence_results_are_rejected() {
        assert_eq!(
            filter().evaluate("hello there", Some(0.5), None),
            Verdict::LowConfidence
        );
        assert_eq!(
            filter().evaluate("hello there", Some(0.59), None),
            Verdict::LowConfidence
        );
    }

    #[test]
    fn missing_confidence_is_trusted() {
        assert_eq!(
            filter().evaluate("hello there", None, None),
            Verdict::Accepted("hello there".to_string())
        );
    }

    #[test]
    fn duplicates_of_the_last_accepted_are_rejected() {
        let f = filter();
        assert_eq!(
            f.evaluate("hello there", Some(0.9), Some("hello there")),
            Verdict::Duplicate
        );
        // Comparison happens after trimming
        assert_eq!(
            f.evaluate("  hello there  ", Some(0.9), Some("hello there")),
            Verdict::Duplicate
        );
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        assert_eq!(
            filter().evaluate("Hello There", Some(0.9), Some("hello there")),
            Verdict::Accepted("Hello There".to_string())
        );
    }

    #[test]
    fn different_text_after_an_accepted_utterance_is_accepted() {
        assert_eq!(
            filter().evaluate("how are you", Some(0.9), Some("hello there")),
            Verdict::Accepted("how are you".to_string())
        );
    }

    #[test]
    fn accepted_text_is_trimmed() {
        assert_eq!(
            filter().evaluate("  hello there \n", Some(0.9), None),
            Verdict::Accepted("hello there".to_string())
        );
    }

    #[test]
    fn boundary_confidence_is_accepted() {
        assert_eq!(
            filter().evaluate("hello there", Some(0.6), None),
            Verdict::Accepted("hello there".to_string())
        );
    }
}
