//! Reading the four dimensions out of a scoring response.

use serde_json::{Map, Value};

use super::ScoringError;
use crate::domain::Scores;

/// Pull the model's text out of a response body.
///
/// Accepts a chat-completion envelope (`choices[0].message.content`) or any
/// other body, which is returned unchanged.
pub fn extract_content(body: &str) -> Result<String, ScoringError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(body.to_string());
    };

    match value.get("choices") {
        Some(choices) => choices
            .get(0)
            .and_then(|c| c.pointer("/message/content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ScoringError::InvalidResponse {
                reason: "completion has no message content".to_string(),
                raw: Some(body.to_string()),
            }),
        None => Ok(body.to_string()),
    }
}

/// Parse and validate the four dimensions from `content`.
///
/// The first JSON object in the text is used, so fenced or chatty model
/// output is tolerated. Values may be numbers or numeric strings; resolution
/// may also be a boolean. Field names are matched case-insensitively.
pub fn parse_scores(content: &str) -> Result<Scores, ScoringError> {
    let invalid = |reason: String| ScoringError::InvalidResponse {
        reason,
        raw: Some(content.to_string()),
    };

    let object = first_json_object(content)
        .ok_or_else(|| invalid("no JSON object in scoring response".to_string()))?;

    let scores = Scores::new(
        field(&object, "coherence").map_err(invalid)?,
        field(&object, "politeness").map_err(invalid)?,
        field(&object, "relevance").map_err(invalid)?,
        field(&object, "resolution").map_err(invalid)?,
    );
    scores.validate().map_err(invalid)?;
    Ok(scores)
}

fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text.trim()) {
        return Some(map);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn field(object: &Map<String, Value>, name: &str) -> Result<f64, String> {
    let value = object
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
        .ok_or_else(|| format!("missing field: {name}"))?;

    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("{name} is not a finite number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{name} is not numeric: {s:?}")),
        Value::Bool(b) if name == "resolution" => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(format!("{name} has unexpected type: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let scores =
            parse_scores(r#"{"coherence": 4, "politeness": 5, "relevance": 3, "resolution": 1}"#)
                .unwrap();
        assert_eq!(scores, Scores::new(4.0, 5.0, 3.0, 1.0));
    }

    #[test]
    fn parses_fenced_output_with_strings_and_bool() {
        let content = "Here you go:\n```json\n{\"Coherence\": \"4\", \"politeness\": 4.5, \
                       \"relevance\": 5, \"resolution\": false}\n```";
        let scores = parse_scores(content).unwrap();
        assert_eq!(scores, Scores::new(4.0, 4.5, 5.0, 0.0));
    }

    #[test]
    fn missing_dimension_is_invalid_response() {
        let err = parse_scores(r#"{"coherence": 4, "politeness": 5, "resolution": 1}"#)
            .unwrap_err();
        match err {
            ScoringError::InvalidResponse { reason, raw } => {
                assert!(reason.contains("relevance"));
                assert!(raw.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_is_invalid_response() {
        let err = parse_scores(r#"{"coherence": 9, "politeness": 5, "relevance": 5, "resolution": 1}"#)
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidResponse { .. }));
    }

    #[test]
    fn prose_without_json_is_invalid_response() {
        assert!(matches!(
            parse_scores("I cannot grade this conversation."),
            Err(ScoringError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn extracts_chat_completion_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"coherence\":5}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"coherence":5}"#);
    }

    #[test]
    fn non_envelope_body_is_returned_as_is() {
        let body = r#"{"coherence": 5}"#;
        assert_eq!(extract_content(body).unwrap(), body);
        assert_eq!(extract_content("plain text").unwrap(), "plain text");
    }

    #[test]
    fn envelope_without_content_is_invalid() {
        assert!(matches!(
            extract_content(r#"{"choices": []}"#),
            Err(ScoringError::InvalidResponse { .. })
        ));
    }
}
