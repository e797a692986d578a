//! Tolerant parsing and repair of near-JSON model output.
//!
//! VLM output is supposed to be a JSON object but in practice arrives wrapped
//! in markdown fences, with trailing or missing commas, or with stray control
//! characters. The repair policy is an ordered chain of pure text transforms;
//! each strategy is recorded so a failed strict parse is observable. The
//! chain never errors: when everything else fails, per-field regex extraction
//! synthesizes a partial record with `difficulty = unknown`.

use super::ExtractionRecord;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// A repair strategy that was applied to the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Markdown fences or surrounding prose were stripped.
    StrippedFences,
    /// Stray control characters were removed.
    SanitizedControlCharacters,
    /// Trailing commas before `}` or `]` were removed.
    RemovedTrailingCommas,
    /// Missing commas between adjacent key-value pairs were inserted.
    InsertedMissingCommas,
    /// Strict parsing was abandoned; fields were regex-extracted.
    FieldExtraction,
}

/// Location of the original strict-parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseFailure {
    pub line: usize,
    pub column: usize,
}

/// Result of the repair chain: a best-effort record plus the repair log.
#[derive(Debug)]
pub struct RepairedParse {
    pub record: ExtractionRecord,
    pub repairs: Vec<Repair>,
    /// Where the first strict parse of the (fence-stripped) text failed.
    pub failure: Option<ParseFailure>,
}

impl RepairedParse {
    /// Whether strict parsing was abandoned entirely.
    pub fn is_fallback(&self) -> bool {
        self.repairs.contains(&Repair::FieldExtraction)
    }
}

/// Parse near-JSON model output into an extraction record.
///
/// Never fails: valid JSON passes through untouched, repairable text is
/// repaired, and unparseable garbage yields a partial record with all
/// missing fields empty and `difficulty = unknown`.
pub fn parse(raw: &str) -> RepairedParse {
    let mut repairs = Vec::new();

    let stripped = strip_fences(raw);
    if stripped.trim() != raw.trim() {
        repairs.push(Repair::StrippedFences);
    }

    let sanitized = sanitize_control_characters(&stripped);
    if sanitized != stripped {
        repairs.push(Repair::SanitizedControlCharacters);
    }

    // Strict attempt on the cleaned text.
    let failure = match serde_json::from_str::<ExtractionRecord>(&sanitized) {
        Ok(record) => {
            return RepairedParse {
                record,
                repairs,
                failure: None,
            }
        }
        Err(e) => Some(ParseFailure {
            line: e.line(),
            column: e.column(),
        }),
    };

    // Comma repair heuristics, then re-attempt.
    let without_trailing = remove_trailing_commas(&sanitized);
    if without_trailing != sanitized {
        repairs.push(Repair::RemovedTrailingCommas);
    }
    let with_commas = insert_missing_commas(&without_trailing);
    if with_commas != without_trailing {
        repairs.push(Repair::InsertedMissingCommas);
    }

    if let Ok(record) = serde_json::from_str::<ExtractionRecord>(&with_commas) {
        debug!("Recovered record after comma repair ({:?})", repairs);
        return RepairedParse {
            record,
            repairs,
            failure,
        };
    }

    // Last resort: pull out whatever fields are recognizable.
    repairs.push(Repair::FieldExtraction);
    debug!(
        "Strict parse failed at {:?}; falling back to field extraction",
        failure
    );
    RepairedParse {
        record: extract_fields(&with_commas),
        repairs,
        failure,
    }
}

/// Strip markdown fences and surrounding prose down to the outermost object.
pub fn strip_fences(text: &str) -> String {
    let mut candidate = text;

    if let Some(open) = candidate.find("```") {
        let after = &candidate[open + 3..];
        // Skip an optional language tag on the fence line.
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        candidate = match body.find("```") {
            Some(close) => &body[..close],
            None => body,
        };
    }

    match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if end > start => candidate[start..=end].to_string(),
        _ => candidate.trim().to_string(),
    }
}

/// Remove control characters that strict JSON forbids, keeping whitespace.
fn sanitize_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Remove trailing commas immediately before `}` or `]`.
fn remove_trailing_commas(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"));
    re.replace_all(text, "$1").into_owned()
}

/// Insert a comma at the boundary between a closing quote/brace/bracket and
/// the next `"key":` pair.
fn insert_missing_commas(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(["}\]])(\s+)"((?:[^"\\]|\\.)*)"(\s*:)"#).expect("valid regex")
    });
    re.replace_all(text, "$1,$2\"$3\"$4").into_owned()
}

/// Regex-extract the known keys from unparseable text.
fn extract_fields(text: &str) -> ExtractionRecord {
    let mut record = ExtractionRecord::default();

    if let Some(v) = extract_string(text, "visual_description") {
        record.visual_description = v;
    }
    if let Some(v) = extract_string(text, "cognitive_summary") {
        record.cognitive_summary = v;
    }
    record.speaker_info = extract_string(text, "speaker_info").filter(|s| !s.is_empty());
    record.technical_details = extract_string_array(text, "technical_details");
    record.key_concepts = extract_string_array(text, "key_concepts").into_iter().collect();
    if let Some(d) = extract_string(text, "difficulty") {
        record.difficulty = d.parse().unwrap_or_default();
    }

    record
}

/// Extract a single string value for a key, unescaping JSON escapes.
fn extract_string(text: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#,
        regex::escape(key)
    ))
    .ok()?;
    let raw = re.captures(text)?.get(1)?.as_str();
    Some(unescape(raw))
}

/// Extract an array of strings for a key. A bare string value is treated as
/// a single-element array, since models sometimes flatten short lists.
fn extract_string_array(text: &str, key: &str) -> Vec<String> {
    let array_re = match Regex::new(&format!(
        r#""{}"\s*:\s*\[([^\]]*)\]"#,
        regex::escape(key)
    )) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    if let Some(caps) = array_re.captures(text) {
        static ITEM: OnceLock<Regex> = OnceLock::new();
        let item_re =
            ITEM.get_or_init(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("valid regex"));
        return item_re
            .captures_iter(caps.get(1).map(|m| m.as_str()).unwrap_or(""))
            .filter_map(|c| c.get(1).map(|m| unescape(m.as_str())))
            .collect();
    }

    extract_string(text, key)
        .filter(|s| !s.is_empty())
        .map(|s| vec![s])
        .unwrap_or_default()
}

/// Unescape a JSON string body, falling back to the raw text.
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
