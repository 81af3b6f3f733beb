use serde_json::error::Category;
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Field marker of the legacy (pre-JSON) snapshot encoding, in its escaped form.
pub const LEGACY_MARKER: &str = r"\mapname\";

/// Diagnostic classification of a snapshot decode fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Parser nesting limit hit.
    DepthExceeded,
    /// Structurally inconsistent document (truncation or wrong top-level shape).
    StateMismatch,
    /// Unescaped control character inside a string.
    ControlCharacter,
    /// Generic malformed syntax.
    SyntaxError,
    /// The document is a legacy-format snapshot, not JSON.
    LegacyFormatDetected,
    /// Malformed byte sequence for UTF-8.
    InvalidEncoding,
    /// Any other decoder fault.
    Unknown,
}

/// A classified snapshot decode failure.
///
/// Carries a short human-readable message and the originating file path for
/// operator alerts, plus the raw decoder diagnostic for debugging.
#[derive(Debug, Error)]
#[error("{message} ({path})")]
pub struct DecodeError {
    /// Classified fault kind.
    pub kind: DecodeErrorKind,
    /// Short human-readable message.
    pub message: String,
    /// Path of the file that failed to decode.
    pub path: String,
    /// Raw diagnostic from the underlying decoder.
    pub detail: String,
}

/// Decodes raw snapshot bytes into an ordered JSON mapping.
///
/// The input must be UTF-8 encoded JSON with an object at the top level.
/// Duplicate keys follow last-wins mapping semantics. On failure the decoder
/// fault is classified into a [`DecodeErrorKind`] and returned together with
/// the file path and the raw diagnostic.
///
/// # Arguments
///
/// * `raw` - The raw bytes of the snapshot file.
/// * `path` - The path of the file, included in the error for alerts.
///
/// # Returns
///
/// * `Ok(Map<String, Value>)` - The decoded mapping, preserving key order.
/// * `Err(DecodeError)` - A classified decode failure.
pub fn decode_report(raw: &[u8], path: &Path) -> Result<Map<String, Value>, DecodeError> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            return Err(DecodeError {
                kind: DecodeErrorKind::InvalidEncoding,
                message: "Snapshot is not valid UTF-8".to_string(),
                path: path.display().to_string(),
                detail: e.to_string(),
            })
        }
    };

    serde_json::from_str::<Map<String, Value>>(text).map_err(|e| classify(&e, text, path))
}

/// Maps a `serde_json` fault onto the diagnostic taxonomy.
///
/// The depth-limit and control-character faults are recognized from the
/// decoder diagnostic before the generic category mapping. A generic syntax
/// fault is upgraded to [`DecodeErrorKind::LegacyFormatDetected`] when the
/// raw text carries the legacy field marker.
fn classify(err: &serde_json::Error, text: &str, path: &Path) -> DecodeError {
    let detail = err.to_string();

    let (kind, message) = if detail.contains("recursion limit exceeded") {
        (
            DecodeErrorKind::DepthExceeded,
            "Snapshot nesting exceeds the decoder depth limit",
        )
    } else if detail.contains("control character") {
        (
            DecodeErrorKind::ControlCharacter,
            "Snapshot contains an unescaped control character in a string",
        )
    } else {
        match err.classify() {
            Category::Eof | Category::Data => (
                DecodeErrorKind::StateMismatch,
                "Snapshot document is structurally inconsistent",
            ),
            Category::Syntax => {
                if text.contains(LEGACY_MARKER) {
                    (
                        DecodeErrorKind::LegacyFormatDetected,
                        "Snapshot uses the legacy format and cannot be imported",
                    )
                } else {
                    (
                        DecodeErrorKind::SyntaxError,
                        "Snapshot contains malformed JSON syntax",
                    )
                }
            }
            Category::Io => (DecodeErrorKind::Unknown, "Snapshot could not be decoded"),
        }
    };

    DecodeError {
        kind,
        message: message.to_string(),
        path: path.display().to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &[u8]) -> Result<Map<String, Value>, DecodeError> {
        decode_report(raw, Path::new("test.json"))
    }

    /// Tests that a well-formed snapshot decodes to a mapping with key order preserved.
    #[test]
    fn test_decode_valid_object() {
        let map = decode(br#"{"mapName": "berlin", "authId": "A1"}"#).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["mapName", "authId"]);
    }

    #[test]
    fn test_decode_duplicate_keys_last_wins() {
        let map = decode(br#"{"mapName": "berlin", "mapName": "kursk"}"#).unwrap();
        assert_eq!(map["mapName"], "kursk");
    }

    #[test]
    fn test_classify_generic_syntax_error() {
        let err = decode(br#"{"mapName": }"#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::SyntaxError);
        assert_eq!(err.path, "test.json");
        assert!(!err.detail.is_empty());
    }

    /// The legacy marker must beat the generic syntax diagnosis.
    #[test]
    fn test_classify_legacy_marker_over_syntax_error() {
        let err = decode(br"\mapname\berlin\gametype\conquest").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::LegacyFormatDetected);
    }

    #[test]
    fn test_classify_control_character() {
        let err = decode(b"{\"serverName\": \"bad\x01name\"}").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::ControlCharacter);
    }

    #[test]
    fn test_classify_depth_exceeded() {
        let mut doc = String::from("{\"players\": ");
        doc.push_str(&"[".repeat(200));
        doc.push_str(&"]".repeat(200));
        doc.push('}');
        let err = decode(doc.as_bytes()).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::DepthExceeded);
    }

    #[test]
    fn test_classify_truncated_document() {
        let err = decode(br#"{"mapName": "#).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::StateMismatch);
    }

    /// A non-object top level is structurally inconsistent, not a syntax fault.
    #[test]
    fn test_classify_non_object_top_level() {
        let err = decode(b"[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::StateMismatch);
    }

    #[test]
    fn test_classify_invalid_encoding() {
        let err = decode(b"{\"serverName\": \"\xff\xfe\"}").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidEncoding);
    }
}
