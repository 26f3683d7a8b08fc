//! Structured-text reply decoding with best-effort salvage.
//!
//! Generation replies are large and occasionally hit provider-side length
//! ceilings mid-artifact. Losing a whole generation to a one-character JSON
//! truncation is unacceptable, so artifact decoding is two-tier: strict
//! parse first, then a bounded pattern-based recovery of the `html` field.
//! The recovery pattern encodes real backend failure modes and callers
//! rely on it, so it is a contract rather than an implementation detail.

use deck_common::Presentation;
use deck_protocol::{AnalysisReply, ArtifactReply};

use crate::error::{DeckError, Result};

/// Decoded generate/review reply. `salvaged` marks a partial result
/// recovered from a truncated reply; salvage is a first-class outcome, not
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPayload {
    pub html: String,
    pub fixes: Option<String>,
    pub salvaged: bool,
}

/// Analysis replies are small and never truncated in practice; strict
/// parsing only.
pub fn parse_analysis(raw: &str) -> Result<AnalysisReply> {
    serde_json::from_str(raw)
        .map_err(|err| DeckError::Decode(format!("analysis reply malformed: {err}")))
}

/// Deck-generation replies carry a whole presentation; strict parsing.
pub fn parse_presentation(raw: &str) -> Result<Presentation> {
    serde_json::from_str(raw)
        .map_err(|err| DeckError::Decode(format!("presentation reply malformed: {err}")))
}

/// Decode a generate/review reply, salvaging a partial artifact from
/// malformed or truncated input when strict parsing fails.
pub fn parse_artifact(raw: &str) -> Result<ArtifactPayload> {
    if let Ok(reply) = serde_json::from_str::<ArtifactReply>(raw) {
        return Ok(ArtifactPayload {
            html: reply.html,
            fixes: reply.fixes,
            salvaged: false,
        });
    }

    match salvage_html(raw) {
        Some(html) if !html.is_empty() => {
            tracing::warn!(
                recovered_bytes = html.len(),
                "artifact reply malformed; salvaged partial html"
            );
            Ok(ArtifactPayload {
                html,
                fixes: None,
                salvaged: true,
            })
        }
        _ => Err(DeckError::Decode(
            "response malformed or truncated".to_string(),
        )),
    }
}

/// Locate the `"html"` field by its textual anchor and recover the string
/// body up to the unescaped closing quote, or to end-of-input when the
/// reply was cut off mid-string.
fn salvage_html(raw: &str) -> Option<String> {
    let anchor = raw.find("\"html\"")?;
    let after_key = &raw[anchor + "\"html\"".len()..];
    let colon = after_key.find(':')?;
    let after_colon = after_key[colon + 1..].trim_start();
    let body = after_colon.strip_prefix('"')?;

    let bytes = body.as_bytes();
    let mut end = bytes.len();
    let mut closed = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => {
                end = i;
                closed = true;
                break;
            }
            _ => i += 1,
        }
    }

    let mut fragment = &body[..end.min(body.len())];
    if !closed {
        fragment = strip_partial_escape(fragment);
    }
    if fragment.is_empty() {
        return None;
    }

    // Unescape through the JSON string rules; fall back to a manual
    // substitution pass when the fragment carries escapes serde rejects.
    match serde_json::from_str::<String>(&format!("\"{fragment}\"")) {
        Ok(html) => Some(html),
        Err(_) => Some(manual_unescape(fragment)),
    }
}

/// Drop a trailing incomplete escape left by mid-string truncation: a lone
/// backslash or a partial `\uXXXX` sequence.
fn strip_partial_escape(fragment: &str) -> &str {
    let bytes = fragment.as_bytes();

    // Partial unicode escape: `\u` followed by fewer than 4 hex digits,
    // where the backslash genuinely starts an escape (odd backslash run).
    for digits in 0..=3usize {
        if bytes.len() < digits + 2 {
            break;
        }
        let tail_start = bytes.len() - digits;
        if !bytes[tail_start..].iter().all(|b| b.is_ascii_hexdigit()) {
            continue;
        }
        let head = &bytes[..tail_start];
        if head.ends_with(b"\\u") && trailing_backslashes(&head[..head.len() - 1]) % 2 == 1 {
            return &fragment[..head.len() - 2];
        }
    }

    if trailing_backslashes(bytes) % 2 == 1 {
        return &fragment[..fragment.len() - 1];
    }
    fragment
}

fn trailing_backslashes(bytes: &[u8]) -> usize {
    bytes.iter().rev().take_while(|&&b| b == b'\\').count()
}

/// Last-resort unescape: walk the fragment substituting the common JSON
/// escape sequences, tolerating ones serde would reject.
fn manual_unescape(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut chars = fragment.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
