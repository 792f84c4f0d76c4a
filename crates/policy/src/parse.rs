//! Parsing model replies back into a [`Decision`].
//!
//! Models wrap JSON in code fences, prefix it with prose, or append a
//! sign-off. The first balanced JSON object in the reply is taken as the
//! answer; everything about it is then validated strictly.

use sentinel_core::decision::{Action, Decision, Severity};
use sentinel_core::error::PolicyError;

/// Longest excerpt of a bad value carried in a violation.
const EXCERPT_CHARS: usize = 120;

fn violation(field: &str, value: &str) -> PolicyError {
    let mut value: String = value.chars().take(EXCERPT_CHARS).collect();
    if value.is_empty() {
        value.push_str("<missing>");
    }
    PolicyError::ComplianceViolation {
        field: field.to_string(),
        value,
    }
}

/// Parse a model reply into a decision.
///
/// Returns `ComplianceViolation` naming the first offending field when the
/// reply has no JSON object, a field is missing, blank or not a string, or a
/// label is outside its enumeration.
pub fn parse_decision(reply: &str) -> Result<Decision, PolicyError> {
    let object = extract_json_object(reply).ok_or_else(|| violation("output", reply.trim()))?;

    let text_field = |name: &str| -> Result<String, PolicyError> {
        match object.get(name) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(serde_json::Value::String(_)) => Err(violation(name, "")),
            Some(other) => Err(violation(name, &other.to_string())),
            None => Err(violation(name, "")),
        }
    };

    let reasoning = text_field("reasoning")?;
    let root_cause = text_field("root_cause")?;
    let severity: Severity = text_field("severity")?.parse()?;
    let suggested_action: Action = text_field("suggested_action")?.parse()?;

    Ok(Decision {
        reasoning,
        root_cause,
        severity,
        suggested_action,
    })
}

/// Find the first `{...}` span that is balanced and parses as a JSON object.
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let end = balanced_end(&text[start..])?;
            match serde_json::from_str(&text[start..start + end]) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                _ => None,
            }
        })
}

/// Byte length of the balanced object at the start of `text`, honoring
/// string literals and escapes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
