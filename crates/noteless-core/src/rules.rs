//! Command rule set: the three gates a detection must pass, and the
//! human-readable rule text served alongside them.
//!
//! A detection qualifies as a command when
//!
//! 1. its text is longer than one character (**length gate**),
//! 2. its confidence is strictly above the threshold (**confidence gate**),
//! 3. its lower-cased text is a command word (**vocabulary gate**).
//!
//! The rule text returned by [`RuleSet::render_text`] is rendered from the
//! same [`RuleSet`] value that drives the gates, so the description a client
//! reads and the predicate the engine runs always agree.

use crate::error::{NoteError, Result};

/// Words recognized as commands, lower-case.
pub const COMMAND_VOCABULARY: [&str; 9] = [
    "go", "stop", "on", "off", "left", "right", "up", "down", "to",
];

/// Confidence a detection must exceed to count as a command.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 90.0;

/// Thresholds and vocabulary for command extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    threshold: f64,
    vocabulary: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl RuleSet {
    /// The standard vocabulary with a custom confidence threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            vocabulary: COMMAND_VOCABULARY.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Checks the rule set can be evaluated at all.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=100.0).contains(&self.threshold) {
            return Err(NoteError::Extraction(format!(
                "confidence threshold must be within [0, 100], got {}",
                self.threshold
            )));
        }
        if self.vocabulary.is_empty() {
            return Err(NoteError::Extraction(
                "command vocabulary is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Rejects empty and single-character text. Counts characters, not bytes.
    pub fn length_gate(text: &str) -> bool {
        text.chars().nth(1).is_some()
    }

    /// Strictly greater-than: a confidence equal to the threshold fails.
    pub fn confidence_gate(&self, confidence: f64) -> bool {
        confidence > self.threshold
    }

    /// Returns the lower-cased command word when `text` is in the vocabulary.
    pub fn vocabulary_gate(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        self.vocabulary
            .iter()
            .any(|w| *w == lowered)
            .then_some(lowered)
    }

    /// Runs all three gates; on success returns the composite command string.
    pub fn evaluate(&self, text: &str, confidence: f64) -> Option<String> {
        if !Self::length_gate(text) || !self.confidence_gate(confidence) {
            return None;
        }
        self.vocabulary_gate(text)
            .map(|word| format_command(&word, confidence))
    }

    /// True when all three gates accept the detection.
    pub fn passes(&self, text: &str, confidence: f64) -> bool {
        self.evaluate(text, confidence).is_some()
    }

    /// The declarative description of this rule set, as served on `/rules`.
    pub fn render_text(&self) -> String {
        let words = self
            .vocabulary
            .iter()
            .map(|w| format!("\"{}\"", w))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"package noteless

# A detection is reported as a command when its text
#   1. is longer than one character,
#   2. was recognized with more than {threshold:?}% confidence,
#   3. matches one of the command words, ignoring case.
detected_commands[msg] {{
	some i, j
	d := input[i].Detections.TextDetections[j]
	count(d.DetectedText) > 1
	d.Confidence > {threshold:?}
	is_command(d.DetectedText)
	msg := sprintf("%v (%4.2f%%)", [lower(d.DetectedText), d.Confidence])
}}

# checks whether a word is a command
is_command(candidate) {{
	commands := [{words}]
	commands[_] = lower(candidate)
}}
"#,
            threshold = self.threshold,
            words = words
        )
    }
}

/// Renders a command candidate: `"go (95.00%)"`.
pub fn format_command(word: &str, confidence: f64) -> String {
    format!("{} ({:4.2}%)", word, confidence)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shared gate fixture: `(text, confidence, expected command)`.
    ///
    /// Exercised against both the gates and the rendered rule text.
    pub(crate) const GATE_FIXTURE: &[(&str, f64, Option<&str>)] = &[
        ("GO", 95.0, Some("go (95.00%)")),
        ("Go", 95.0, Some("go (95.00%)")),
        ("stop", 50.0, None),
        ("banana", 99.0, None),
        ("to", 90.0, None),
        ("to", 90.01, Some("to (90.01%)")),
        ("", 99.0, None),
        ("o", 99.0, None),
        ("LEFT", 99.999, Some("left (100.00%)")),
        ("off ", 97.0, None),
        ("down", f64::NAN, None),
        ("Right", 100.0, Some("right (100.00%)")),
    ];

    #[test]
    fn test_gate_fixture() {
        let rules = RuleSet::default();
        for (text, confidence, expected) in GATE_FIXTURE {
            assert_eq!(
                rules.evaluate(text, *confidence).as_deref(),
                *expected,
                "text={:?} confidence={}",
                text,
                confidence
            );
            assert_eq!(rules.passes(text, *confidence), expected.is_some());
        }
    }

    #[test]
    fn test_rule_text_describes_fixture_rules() {
        let rules = RuleSet::default();
        let text = rules.render_text();
        assert!(text.contains("d.Confidence > 90.0"));
        assert!(text.contains("count(d.DetectedText) > 1"));
        assert!(text.contains("lower(candidate)"));
        for word in COMMAND_VOCABULARY {
            assert!(text.contains(&format!("\"{}\"", word)), "missing {}", word);
        }
        for (text_in, _, expected) in GATE_FIXTURE {
            if let Some(cmd) = expected {
                let word = cmd.split(' ').next().unwrap();
                assert_eq!(word, text_in.to_lowercase());
                assert!(text.contains(&format!("\"{}\"", word)));
            }
        }
    }

    #[test]
    fn test_rule_text_follows_threshold() {
        let text = RuleSet::with_threshold(96.5).render_text();
        assert!(text.contains("d.Confidence > 96.5"));
        assert!(!text.contains("> 90.0"));
    }

    #[test]
    fn test_length_gate_counts_chars() {
        assert!(!RuleSet::length_gate(""));
        assert!(!RuleSet::length_gate("x"));
        assert!(!RuleSet::length_gate("é"));
        assert!(RuleSet::length_gate("up"));
        assert!(RuleSet::length_gate("éé"));
    }

    #[test]
    fn test_confidence_boundary_is_exclusive() {
        let rules = RuleSet::default();
        assert!(!rules.confidence_gate(90.0));
        assert!(rules.confidence_gate(90.000001));
        assert!(!rules.confidence_gate(f64::NAN));
    }

    #[test]
    fn test_vocabulary_gate_case_folds() {
        let rules = RuleSet::default();
        assert_eq!(rules.vocabulary_gate("STOP").as_deref(), Some("stop"));
        assert_eq!(rules.vocabulary_gate("Stop!"), None);
        assert_eq!(rules.vocabulary_gate("stopp"), None);
    }

    #[test]
    fn test_format_command_precision() {
        assert_eq!(format_command("go", 95.0), "go (95.00%)");
        assert_eq!(format_command("up", 91.23456), "up (91.23%)");
        assert_eq!(format_command("on", 5.5), "on (5.50%)");
    }

    #[test]
    fn test_validate() {
        assert!(RuleSet::default().validate().is_ok());
        assert!(RuleSet::with_threshold(0.0).validate().is_ok());
        assert!(RuleSet::with_threshold(100.0).validate().is_ok());

        let err = RuleSet::with_threshold(f64::NAN).validate().unwrap_err();
        assert!(matches!(err, NoteError::Extraction(_)));
        assert!(RuleSet::with_threshold(120.0).validate().is_err());
        assert!(RuleSet::with_threshold(-1.0).validate().is_err());

        let empty = RuleSet {
            threshold: 90.0,
            vocabulary: Vec::new(),
        };
        assert!(empty.validate().is_err());
    }
}
