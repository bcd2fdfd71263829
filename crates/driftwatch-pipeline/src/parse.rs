//! Parsing structured data out of free-form model output

use driftwatch_core::{DriftAssessment, DriftLevel, DriftReport, DriftSource, FlaggedTransition};
use serde::Deserialize;
use std::str::FromStr;
use tracing::warn;

/// Result of trying to read a structured value from model text
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    Fallback { value: T, reason: String },
}

impl<T> ParseOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            ParseOutcome::Parsed(value) | ParseOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            ParseOutcome::Parsed(value) | ParseOutcome::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ParseOutcome::Fallback { .. })
    }
}

/// The first balanced `{...}` span in `text`
///
/// Braces inside JSON string literals are ignored, so prose before or after
/// the object (and code fences around it) do not matter.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[derive(Deserialize)]
struct LooseTransition {
    #[serde(default)]
    from: serde_json::Value,
    #[serde(default)]
    to: serde_json::Value,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    suggested_action: String,
}

#[derive(Deserialize)]
struct LooseDriftReport {
    drift_level: String,
    #[serde(default)]
    flagged_transitions: Vec<LooseTransition>,
    #[serde(default)]
    reasoning: String,
}

fn text_of(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn try_parse_drift(text: &str) -> Result<DriftReport, String> {
    let object = first_json_object(text).ok_or_else(|| "no JSON object found".to_string())?;
    let loose: LooseDriftReport =
        serde_json::from_str(object).map_err(|e| format!("invalid JSON: {}", e))?;
    let drift_level = DriftLevel::from_str(&loose.drift_level).map_err(|e| e.to_string())?;

    Ok(DriftReport {
        drift_level,
        flagged_transitions: loose
            .flagged_transitions
            .into_iter()
            .map(|t| FlaggedTransition {
                from: text_of(t.from),
                to: text_of(t.to),
                reason: t.reason,
                suggested_action: t.suggested_action,
            })
            .collect(),
        reasoning: loose.reasoning,
    })
}

/// Read a drift report from model output, substituting the fallback on failure
pub fn parse_drift_report(text: &str) -> ParseOutcome<DriftReport> {
    match try_parse_drift(text) {
        Ok(report) => ParseOutcome::Parsed(report),
        Err(reason) => {
            warn!("Drift output unusable, using fallback: {}", reason);
            ParseOutcome::Fallback {
                value: DriftReport::fallback(),
                reason,
            }
        }
    }
}

impl From<ParseOutcome<DriftReport>> for DriftAssessment {
    fn from(outcome: ParseOutcome<DriftReport>) -> Self {
        match outcome {
            ParseOutcome::Parsed(report) => DriftAssessment {
                report,
                source: DriftSource::Parsed,
            },
            ParseOutcome::Fallback { value, reason } => DriftAssessment {
                report: value,
                source: DriftSource::Fallback { reason },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_json_object_skips_prose_and_nested_braces() {
        let text = r#"Sure! Here it is: {"a": {"b": "x}y"}, "c": 1} and {"second": true}"#;
        assert_eq!(
            first_json_object(text),
            Some(r#"{"a": {"b": "x}y"}, "c": 1}"#)
        );
        assert_eq!(first_json_object("no braces"), None);
        assert_eq!(first_json_object("{ unterminated"), None);
    }

    #[test]
    fn test_embedded_report_is_parsed() {
        let text = "Analysis follows.\n```json\n{\"drift_level\": \"high\", \"flagged_transitions\": \
                    [{\"from\": \"CLT\", \"to\": \"SRI\", \"reason\": \"abandoned course\"}], \
                    \"reasoning\": \"scattered\"}\n```\nHope this helps.";

        let outcome = parse_drift_report(text);
        assert!(!outcome.is_fallback());

        let report = outcome.into_value();
        assert_eq!(report.drift_level, DriftLevel::High);
        assert_eq!(report.flagged_transitions.len(), 1);
        assert_eq!(report.flagged_transitions[0].to, "SRI");
        assert_eq!(report.reasoning, "scattered");
    }

    #[test]
    fn test_unparseable_output_falls_back() {
        let outcome = parse_drift_report("I could not decide.");
        assert!(outcome.is_fallback());
        assert_eq!(outcome.value(), &DriftReport::fallback());

        let bad_level = parse_drift_report(r#"{"drift_level": "Severe"}"#);
        assert!(bad_level.is_fallback());

        let assessment = DriftAssessment::from(bad_level);
        assert_eq!(assessment.report.drift_level, DriftLevel::Medium);
        assert!(assessment.is_fallback());
    }
}
