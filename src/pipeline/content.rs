use serde_json::{Map, Value};

pub const NO_TARGETS_PLACEHOLDER: &str = "No specific targets defined";
pub const NO_STATUS_PLACEHOLDER: &str = "No status details provided";

/// Bullets shown in the Target and Status columns. Neither list is ever empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedProgramContent {
    pub targets: Vec<String>,
    pub status_items: Vec<String>,
}

impl ParsedProgramContent {
    pub fn placeholder() -> Self {
        Self {
            targets: vec![NO_TARGETS_PLACEHOLDER.to_string()],
            status_items: vec![NO_STATUS_PLACEHOLDER.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentDocument {
    Parsed(Map<String, Value>),
    Empty,
}

/// Decodes a submission payload into a key-value document, or `Empty` when
/// the blob is absent, does not look like an object, or fails every decode
/// strategy.
pub fn decode_content(blob: Option<&str>) -> ContentDocument {
    let Some(raw) = blob.map(str::trim).filter(|b| !b.is_empty()) else {
        return ContentDocument::Empty;
    };

    if !looks_like_object(raw) && !looks_like_encoded_object(raw) {
        tracing::debug!(
            blob_len = raw.len(),
            "Program content is not an object, skipping decode"
        );
        return ContentDocument::Empty;
    }

    if let Some(doc) = decode_object(raw) {
        return ContentDocument::Parsed(doc);
    }

    // Payloads saved through HTML forms sometimes arrive entity-escaped.
    if raw.contains('&')
        && let Ok(unescaped) = quick_xml::escape::unescape(raw)
        && let Some(doc) = decode_object(&unescaped)
    {
        return ContentDocument::Parsed(doc);
    }

    tracing::debug!(blob_len = raw.len(), "Program content failed to decode");
    ContentDocument::Empty
}

fn looks_like_object(raw: &str) -> bool {
    raw.starts_with('{') && raw.ends_with('}')
}

fn looks_like_encoded_object(raw: &str) -> bool {
    raw.starts_with("\"{") && raw.ends_with("}\"")
}

fn decode_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Object(map) => Some(map),
        // Double-encoded: a JSON string holding the object.
        Value::String(inner) if looks_like_object(inner.trim()) => {
            match serde_json::from_str::<Value>(inner.trim()).ok()? {
                Value::Object(map) => Some(map),
                _ => None,
            }
        }
        _ => None,
    }
}

#[tracing::instrument(name = "content.parse", skip(blob), level = "debug")]
pub fn parse_program_content(blob: Option<&str>) -> ParsedProgramContent {
    match decode_content(blob) {
        ContentDocument::Parsed(doc) => ParsedProgramContent {
            targets: extract_targets(&doc),
            status_items: extract_status_items(&doc),
        },
        ContentDocument::Empty => ParsedProgramContent::placeholder(),
    }
}

fn extract_targets(doc: &Map<String, Value>) -> Vec<String> {
    let from_target = doc.get("target").map(lines_of).unwrap_or_default();
    if !from_target.is_empty() {
        return from_target;
    }

    let from_targets = match doc.get("targets") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    };
    if !from_targets.is_empty() {
        return from_targets;
    }

    vec![NO_TARGETS_PLACEHOLDER.to_string()]
}

fn extract_status_items(doc: &Map<String, Value>) -> Vec<String> {
    let mut items = Vec::new();

    if let Some(achievement) = doc.get("achievement").and_then(scalar_text) {
        items.push(achievement);
    }
    if let Some(status_text) = doc.get("status_text") {
        items.extend(lines_of(status_text));
    }
    if let Some(remarks) = doc.get("remarks").and_then(scalar_text) {
        items.push(remarks);
    }

    if items.is_empty() {
        items.push(NO_STATUS_PLACEHOLDER.to_string());
    }
    items
}

fn lines_of(value: &Value) -> Vec<String> {
    match scalar_text(value) {
        Some(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Non-empty trimmed text of a scalar; null, arrays and objects yield nothing.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_split_on_newlines() {
        let blob = r#"{"target": "Build 10 schools\n\n  Train 200 teachers  \n", "achievement": "6 schools built"}"#;
        let parsed = parse_program_content(Some(blob));
        assert_eq!(parsed.targets, vec!["Build 10 schools", "Train 200 teachers"]);
        assert_eq!(parsed.status_items, vec!["6 schools built"]);
    }

    #[test]
    fn test_targets_array_used_when_target_missing() {
        let blob = r#"{"targets": ["Road A", "", "Road B", 42, null]}"#;
        let parsed = parse_program_content(Some(blob));
        assert_eq!(parsed.targets, vec!["Road A", "Road B", "42"]);
    }

    #[test]
    fn test_targets_scalar_is_single_bullet() {
        let blob = r#"{"targets": "Digitize land records"}"#;
        let parsed = parse_program_content(Some(blob));
        assert_eq!(parsed.targets, vec!["Digitize land records"]);
    }

    #[test]
    fn test_blank_target_falls_back_to_targets() {
        let blob = r#"{"target": "   ", "targets": ["Fallback target"]}"#;
        let parsed = parse_program_content(Some(blob));
        assert_eq!(parsed.targets, vec!["Fallback target"]);
    }

    #[test]
    fn test_status_items_concatenated_in_order() {
        let blob = r#"{"remarks": "Awaiting funds", "status_text": "Phase 1 done\nPhase 2 started", "achievement": "60%"}"#;
        let parsed = parse_program_content(Some(blob));
        assert_eq!(
            parsed.status_items,
            vec!["60%", "Phase 1 done", "Phase 2 started", "Awaiting funds"]
        );
    }

    #[test]
    fn test_object_without_known_keys_gets_placeholders() {
        let parsed = parse_program_content(Some(r#"{"foo": "bar"}"#));
        assert_eq!(parsed, ParsedProgramContent::placeholder());
    }

    #[test]
    fn test_malformed_blobs_get_placeholders() {
        let blobs = [
            r#"{"target": "Build schools""#,
            r#""target": "Build schools"}"#,
            "{not json at all}",
            "[1, 2, 3]",
            "plain text narrative",
            "{",
            "",
            "   ",
        ];
        for blob in blobs {
            let parsed = parse_program_content(Some(blob));
            assert_eq!(parsed, ParsedProgramContent::placeholder(), "blob {blob:?}");
        }
    }

    #[test]
    fn test_missing_blob_gets_placeholders() {
        assert_eq!(parse_program_content(None), ParsedProgramContent::placeholder());
    }

    #[test]
    fn test_entity_escaped_blob_is_decoded() {
        let blob = "{&quot;target&quot;: &quot;Plant 1,000 trees&quot;}";
        let parsed = parse_program_content(Some(blob));
        assert_eq!(parsed.targets, vec!["Plant 1,000 trees"]);
        assert_eq!(parsed.status_items, vec![NO_STATUS_PLACEHOLDER]);
    }

    #[test]
    fn test_decode_content_rejects_non_object_prefix() {
        assert_eq!(decode_content(Some("null")), ContentDocument::Empty);
        assert_eq!(decode_content(Some("  ")), ContentDocument::Empty);
    }

    #[test]
    fn test_decode_nested_object_string() {
        let inner = r#"{"target": "Nested"}"#;
        let map = decode_object(&serde_json::to_string(inner).unwrap());
        assert!(map.is_some());
        assert_eq!(map.unwrap()["target"], "Nested");
    }

    #[test]
    fn test_double_encoded_blob_is_decoded() {
        let blob = serde_json::to_string(r#"{"target": "Line 1\nLine 2"}"#).unwrap();
        let parsed = parse_program_content(Some(&blob));
        assert_eq!(parsed.targets, vec!["Line 1", "Line 2"]);
    }

    #[test]
    fn test_decode_content_object() {
        match decode_content(Some(r#" {"achievement": "done"} "#)) {
            ContentDocument::Parsed(map) => assert_eq!(map["achievement"], "done"),
            ContentDocument::Empty => panic!("expected parsed document"),
        }
    }
}
