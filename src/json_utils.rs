//! Best-effort recovery of a JSON payload from free-form model output.
//!
//! Models wrap their JSON in prose, code fences, smart quotes and trailing commas.
//! `parse_recovering` runs, in order:
//! 1. greedy extraction of the leftmost `{...}` or `[...]` span, then a strict parse;
//! 2. sanitization (fences, smart quotes, trailing commas), re-extraction and a second parse;
//! 3. a string-aware scan for balanced root structures, parsing each in turn.
//!
//! This is not a JSON5 parser. Unescaped quotes inside strings or a payload split
//! across disjoint fragments are not guaranteed to recover.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use crate::error::JsonRecoveryError;

/// Longest candidate excerpt carried in a parse error.
const CANDIDATE_PREVIEW: usize = 200;

/// Type of a JSON node found by the bracket scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Byte coordinates of a root-level JSON structure. `end` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonSpan {
    pub start: usize,
    pub end: usize,
    pub kind: NodeType,
}

impl JsonSpan {
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

/// Leftmost-greedy span with the semantics of the pattern `\{[\s\S]*\}|\[[\s\S]*\]`.
///
/// At the first position holding `{` with a later `}` (or `[` with a later `]`),
/// the span runs to the last matching closer in the whole string. Unrelated
/// braces before the payload can therefore widen the span.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let last_brace = text.rfind('}');
    let last_bracket = text.rfind(']');

    for (i, ch) in text.char_indices() {
        match ch {
            '{' => {
                if let Some(end) = last_brace.filter(|&end| end > i) {
                    return Some(&text[i..=end]);
                }
            }
            '[' => {
                if let Some(end) = last_bracket.filter(|&end| end > i) {
                    return Some(&text[i..=end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove a leading ```` ```lang ```` line and a trailing ```` ``` ```` marker.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(nl) => &s[nl + 1..],
            None => s.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }
    s.trim()
}

/// Replace typographic quotes with their ASCII equivalents.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect()
}

/// Drop commas that directly precede (modulo whitespace) a closing `}` or `]`.
/// Commas inside string literals are left alone.
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Full sanitization pass: fences, re-extraction, quotes, trailing commas.
pub fn sanitize(raw: &str) -> String {
    let unfenced = strip_code_fences(raw);
    let quoted = normalize_quotes(unfenced);
    let span = extract_json_span(&quoted).unwrap_or(&quoted).to_string();
    strip_trailing_commas(&span)
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
}

/// Find all balanced root-level object/array structures, skipping brackets inside strings.
pub fn find_json_structures(text: &str) -> Vec<JsonSpan> {
    let mut results = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (i, b) in text.bytes().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' => {
                in_string = true;
                None
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object });
                None
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array });
                None
            }
            b'}' => Some(NodeType::Object),
            b']' => Some(NodeType::Array),
            _ => None,
        };

        if let Some(kind) = closing {
            match stack.pop() {
                Some(frame) if frame.kind == kind => {
                    if stack.is_empty() {
                        results.push(JsonSpan { start: frame.start, end: i, kind });
                    }
                }
                // Mismatched closer: discard everything open and resynchronize.
                Some(_) => stack.clear(),
                None => {}
            }
        }
    }

    trace!(count = results.len(), "found root structures");
    results
}

fn preview(candidate: &str) -> String {
    candidate.chars().take(CANDIDATE_PREVIEW).collect()
}

/// Recover the first JSON value from model output.
///
/// Fails with `NoJsonFound` when the text holds no brace/bracket span at all,
/// otherwise with the strict-parse error of the greedy candidate.
#[instrument(target = "lesson_forge::json", skip(raw), fields(raw_len = raw.len()))]
pub fn parse_recovering(raw: &str) -> Result<Value, JsonRecoveryError> {
    let candidate = extract_json_span(raw).ok_or(JsonRecoveryError::NoJsonFound)?;

    let first_error = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    debug!(error = %first_error, "strict parse failed; sanitizing");

    let cleaned = sanitize(raw);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        debug!("recovered JSON after sanitization");
        return Ok(value);
    }

    let normalized = strip_trailing_commas(&normalize_quotes(strip_code_fences(raw)));
    for span in find_json_structures(&normalized) {
        if let Ok(value) = serde_json::from_str::<Value>(span.slice(&normalized)) {
            debug!(start = span.start, end = span.end, "recovered JSON from balanced structure");
            return Ok(value);
        }
    }

    Err(JsonRecoveryError::Parse {
        source: first_error,
        candidate: preview(candidate),
    })
}

/// `parse_recovering` followed by a typed conversion.
pub fn parse_as<T: DeserializeOwned>(raw: &str) -> Result<T, JsonRecoveryError> {
    let value = parse_recovering(raw)?;
    let candidate = preview(&value.to_string());
    serde_json::from_value(value).map_err(|source| JsonRecoveryError::Parse { source, candidate })
}
