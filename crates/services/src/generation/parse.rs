use serde_json::Value;
use tracing::debug;

use super::raw::RawQuestion;
use crate::error::GeneratorError;

/// Extracts questions from generator output.
///
/// Accepts a bare JSON array, an array inside a markdown code fence, an object with a
/// `questions` array, a single question object, or an array embedded in surrounding prose.
///
/// # Errors
///
/// Returns `GeneratorError::EmptyResponse` for blank output and `GeneratorError::Parse` when no
/// JSON question list can be found or none of its entries decode. Entries that do not decode are
/// dropped while the rest are kept.
pub fn parse_generated(output: &str) -> Result<Vec<RawQuestion>, GeneratorError> {
    let body = strip_fence(output.trim());
    if body.is_empty() {
        return Err(GeneratorError::EmptyResponse);
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return from_value(value);
    }

    // Prose around the array: take the outermost brackets.
    match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => {
            let value = serde_json::from_str::<Value>(&body[start..=end])
                .map_err(|e| GeneratorError::Parse(e.to_string()))?;
            from_value(value)
        }
        _ => Err(GeneratorError::Parse("no JSON array in output".into())),
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the info string, e.g. ```json
    let after = after.find('\n').map_or(after, |nl| &after[nl + 1..]);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}

fn from_value(value: Value) -> Result<Vec<RawQuestion>, GeneratorError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        other => {
            return Err(GeneratorError::Parse(format!(
                "expected a question list, got {other}"
            )));
        }
    };
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut questions = Vec::with_capacity(items.len());
    let mut first_error = None;
    for (position, decoded) in RawQuestion::decode_each(items).into_iter().enumerate() {
        match decoded {
            Ok(question) => questions.push(question),
            Err(error) => {
                debug!(position, %error, "dropping undecodable generated question");
                first_error.get_or_insert(error);
            }
        }
    }
    match first_error {
        Some(error) if questions.is_empty() => Err(GeneratorError::Parse(error.to_string())),
        _ => Ok(questions),
    }
}
