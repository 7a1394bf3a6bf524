// SPDX-License-Identifier: MIT

//! Response Parser (§4.F): locates a delimited JSON-ish fragment in a
//! transcript, repairs common non-JSON liberties the prompts tend to
//! produce, and validates the repaired object against a per-phase table.

use dc_core::{Delimiters, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("could not recover JSON from delimited fragment: {0}")]
    ParseFailed(String),
    #[error("validation failed for phase {phase}: {reason}")]
    Validation { phase: String, reason: String },
}

impl ParserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParserError::ParseFailed(m) => ErrorKind::ParseFailed(m.clone()),
            ParserError::Validation { reason, .. } => ErrorKind::Validation(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_text: Option<String>,
}

impl ParsedResponse {
    fn not_found() -> Self {
        Self { found: false, phase: None, data: None, before_text: None, after_text: None }
    }
}

#[derive(Debug, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Locates the first substring between `delimiters.start` and
    /// `delimiters.end`, repairs and parses it, and validates it against
    /// the phase named by its `phase` field (if `validate_phase` is `Some`).
    pub fn parse(&self, transcript: &str, delimiters: &Delimiters) -> Result<ParsedResponse, ParserError> {
        let Some(start) = transcript.find(delimiters.start.as_str()) else {
            return Ok(ParsedResponse::not_found());
        };
        let after_start = start + delimiters.start.len();
        let Some(end_rel) = transcript[after_start..].find(delimiters.end.as_str()) else {
            return Ok(ParsedResponse::not_found());
        };
        let end = after_start + end_rel;

        let before_text = transcript[..start].to_string();
        let fragment = transcript[after_start..end].trim();
        let after_text = transcript[end + delimiters.end.len()..].to_string();

        let repaired = repair_json(fragment);
        let value: Value = serde_json::from_str(&repaired).map_err(|e| ParserError::ParseFailed(e.to_string()))?;

        let phase = value.get("phase").and_then(Value::as_str).map(String::from);
        let data = value.get("data").cloned();

        Ok(ParsedResponse {
            found: true,
            phase,
            data,
            before_text: Some(before_text),
            after_text: Some(after_text),
        })
    }

    /// Scans for every delimiter pair in the transcript, parsing each.
    pub fn parse_multiple(&self, transcript: &str, delimiters: &Delimiters) -> Vec<ParsedResponse> {
        let mut results = Vec::new();
        let mut cursor = 0;
        while let Some(rel_start) = transcript[cursor..].find(delimiters.start.as_str()) {
            let start = cursor + rel_start;
            match self.parse(&transcript[start..], delimiters) {
                Ok(response) if response.found => {
                    cursor = start + delimiters.start.len();
                    results.push(response);
                }
                _ => break,
            }
        }
        results
    }

    /// Keyword-based fallback when no structured response was found: a
    /// cheap guess at which phase the transcript fragment belongs to.
    pub fn detect_fallback(&self, transcript: &str) -> (String, f32) {
        const KEYWORDS: &[(&str, &[&str])] = &[
            ("analysis", &["recommended_splits", "key_files", "analysis"]),
            ("task_list", &["tasks", "parallelizable_groups", "execution_order"]),
            ("progress", &["progress_percent", "current_action"]),
            ("completion", &["task_id", "completed", "output_files"]),
            ("aggregation", &["merged_output", "conflicts"]),
            ("verification", &["passed", "issues"]),
        ];

        let lower = transcript.to_lowercase();
        let mut best = ("unknown".to_string(), 0.0f32);
        for (phase, keywords) in KEYWORDS {
            let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count();
            if hits == 0 {
                continue;
            }
            let confidence = (0.3 + 0.2 * hits as f32).min(0.9);
            if confidence > best.1 {
                best = (phase.to_string(), confidence);
            }
        }
        best
    }

    /// Validates `data` against the per-phase required/optional table.
    pub fn validate_phase(&self, phase: &str, data: &Value) -> Result<(), ParserError> {
        let required: &[&str] = match phase {
            "analysis" => &["summary", "recommended_splits"],
            "task_list" => &["tasks"],
            "task" => &["id", "title", "description"],
            "progress" => &["task_id", "status"],
            "completion" => &["task_id", "status"],
            "aggregation" => &["status"],
            "verification" => &["status"],
            other => return Err(ParserError::Validation { phase: other.to_string(), reason: "unknown phase".into() }),
        };

        for field in required {
            if data.get(field).is_none() {
                return Err(ParserError::Validation { phase: phase.to_string(), reason: format!("missing field: {field}") });
            }
        }

        match phase {
            "progress" => {
                if let Some(p) = data.get("progress_percent").and_then(Value::as_i64) {
                    if !(0..=100).contains(&p) {
                        return Err(ParserError::Validation { phase: phase.to_string(), reason: "progress_percent out of [0,100]".into() });
                    }
                }
            }
            "completion" => validate_enum(phase, data, "status", &["success", "partial", "failed", "timeout"])?,
            "aggregation" => validate_enum(phase, data, "status", &["success", "needs_input", "failed"])?,
            "verification" => validate_enum(phase, data, "status", &["passed", "passed_with_warnings", "failed"])?,
            _ => {}
        }
        Ok(())
    }
}

fn validate_enum(phase: &str, data: &Value, field: &str, allowed: &[&str]) -> Result<(), ParserError> {
    let value = data.get(field).and_then(Value::as_str).unwrap_or_default();
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ParserError::Validation { phase: phase.to_string(), reason: format!("{field} must be one of {allowed:?}, got {value:?}") })
    }
}

/// Best-effort repair of near-JSON text: strips a BOM, removes `//` and
/// `/* */` comments outside strings, normalises single-quoted strings to
/// double-quoted, quotes bare object keys, and drops trailing commas.
fn repair_json(fragment: &str) -> String {
    let no_bom = fragment.trim_start_matches('\u{feff}');
    let no_comments = strip_comments(no_bom);
    let normalized_quotes = normalize_quotes(&no_comments);
    let quoted_keys = quote_bare_keys(&normalized_quotes);
    remove_trailing_commas(&quoted_keys)
}

fn strip_comments(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;
    let mut in_string: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = Some(c);
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn normalize_quotes(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\'' => {
                out.push('"');
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    if chars[i] == '"' {
                        out.push('\\');
                    }
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i]);
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                out.push('"');
                i += 1;
            }
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                        out.push(chars[i]);
                    }
                    i += 1;
                }
                if i < chars.len() {
                    out.push('"');
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn quote_bare_keys(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }
        if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let mut lookahead = i;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            if chars.get(lookahead) == Some(&':') {
                out.push('"');
                out.extend(&chars[start..i]);
                out.push('"');
            } else {
                out.extend(&chars[start..i]);
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn remove_trailing_commas(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if c == '"' {
            in_string = true;
            out.push(c);
            i += 1;
            continue;
        }
        if c == ',' {
            let mut lookahead = i + 1;
            while lookahead < chars.len() && chars[lookahead].is_whitespace() {
                lookahead += 1;
            }
            if matches!(chars.get(lookahead), Some('}') | Some(']')) {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
