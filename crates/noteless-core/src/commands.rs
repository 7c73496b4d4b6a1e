//! Command extraction over the stored detection corpus.
//!
//! Walks every detection of every record, keeps those that pass the
//! [`RuleSet`] gates, and collects the rendered candidates into a set.
//! Deduplication is by the full rendered string: the same word at the same
//! confidence collapses, the same word at two confidences yields two
//! entries.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use crate::corpus::{decode_record, DecodedRecord};
use crate::error::Result;
use crate::rules::{format_command, RuleSet};

/// A detection that qualified as a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandCandidate {
    /// Lower-cased command word.
    pub text: String,
    /// Confidence as recognized, unmodified.
    pub confidence: f64,
}

impl fmt::Display for CommandCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_command(&self.text, self.confidence))
    }
}

/// Every qualifying detection in `documents`, in corpus order, duplicates kept.
pub fn candidates(documents: &[Value], rules: &RuleSet) -> Result<Vec<CommandCandidate>> {
    let decoded: Vec<DecodedRecord> = documents.iter().map(decode_record).collect();
    decoded_candidates(&decoded, rules)
}

/// Same as [`candidates`] over records that were already decoded.
pub fn decoded_candidates(
    records: &[DecodedRecord],
    rules: &RuleSet,
) -> Result<Vec<CommandCandidate>> {
    rules.validate()?;

    let found = records
        .iter()
        .flat_map(|r| r.detections.iter())
        .filter(|d| rules.passes(&d.text, d.confidence))
        .map(|d| CommandCandidate {
            text: d.text.to_lowercase(),
            confidence: d.confidence,
        })
        .collect();
    Ok(found)
}

/// The set of rendered commands found in `documents`.
pub fn extract_commands(documents: &[Value], rules: &RuleSet) -> Result<BTreeSet<String>> {
    Ok(render(candidates(documents, rules)?))
}

/// The set of rendered commands found in already-decoded records.
pub fn extract_decoded(records: &[DecodedRecord], rules: &RuleSet) -> Result<BTreeSet<String>> {
    Ok(render(decoded_candidates(records, rules)?))
}

fn render(found: Vec<CommandCandidate>) -> BTreeSet<String> {
    found.iter().map(CommandCandidate::to_string).collect()
}
