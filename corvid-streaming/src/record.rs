//! Records and emitted events.

use crate::error::{RecordParseError, RecordParseErrorKind};
use bytes::Bytes;
use serde_json::Value;

/// One newline-delimited segment of the stream, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    bytes: Vec<u8>,
}

impl Record {
    pub(crate) fn new(line: u64, bytes: Vec<u8>) -> Self {
        Self { line, bytes }
    }

    /// 1-based line number of this record in the stream.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Raw bytes, without the delimiter.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether a segment holds nothing but whitespace.
    ///
    /// Uses the same whitespace as [`parse`](Self::parse) trims, so a segment
    /// is either skipped here or handed to the parser, never reported as
    /// malformed for being blank.
    pub(crate) fn is_blank(bytes: &[u8]) -> bool {
        std::str::from_utf8(bytes).map_or(false, |text| text.trim().is_empty())
    }

    /// Decode the record as UTF-8 and parse it as a JSON value.
    pub fn parse(&self) -> Result<Value, RecordParseError> {
        let text = std::str::from_utf8(&self.bytes).map_err(|e| RecordParseError {
            line: self.line,
            kind: RecordParseErrorKind::Utf8,
            message: e.to_string(),
        })?;

        serde_json::from_str(text.trim()).map_err(|e| RecordParseError {
            line: self.line,
            kind: RecordParseErrorKind::Json,
            message: e.to_string(),
        })
    }
}

/// A parsed record, re-encoded as canonical compact JSON.
///
/// Object keys come out sorted, so the text is independent of the upstream's
/// key order and whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    sequence: u64,
    value: Value,
    text: String,
}

impl EmittedEvent {
    /// Build an event from a parsed value.
    pub fn from_value(value: Value, sequence: u64) -> Self {
        let text = value.to_string();
        Self {
            sequence,
            value,
            text,
        }
    }

    /// 0-based position among emitted events.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The parsed value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical JSON text, without a trailing newline.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Canonical JSON text followed by `\n`, ready for a chunked body.
    pub fn to_line_bytes(&self) -> Bytes {
        let mut line = String::with_capacity(self.text.len() + 1);
        line.push_str(&self.text);
        line.push('\n');
        Bytes::from(line)
    }

    /// Take the parsed value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_record() {
        let record = Record::new(1, br#"  {"a": 1}  "#.to_vec());
        assert_eq!(record.parse().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_parse_invalid_json() {
        let record = Record::new(2, b"not-json".to_vec());
        let err = record.parse().unwrap_err();
        assert_eq!(err.kind, RecordParseErrorKind::Json);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let record = Record::new(5, vec![b'"', 0xff, 0xfe, b'"']);
        let err = record.parse().unwrap_err();
        assert_eq!(err.kind, RecordParseErrorKind::Utf8);
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_canonical_text() {
        let value: Value = serde_json::from_str(r#"{ "b" : 2, "a" : [1, 2] }"#).unwrap();
        let event = EmittedEvent::from_value(value, 0);
        assert_eq!(event.as_str(), r#"{"a":[1,2],"b":2}"#);
        assert_eq!(&event.to_line_bytes()[..], b"{\"a\":[1,2],\"b\":2}\n");
    }

    #[test]
    fn test_is_blank() {
        assert!(Record::is_blank(b""));
        assert!(Record::is_blank(b" \t\r"));
        assert!(Record::is_blank(b"\x0B\x0C"));
        assert!(Record::is_blank("\u{a0}\u{2003}".as_bytes()));
        assert!(!Record::is_blank(b" {} "));
        assert!(!Record::is_blank(&[0xff]));
    }

    #[test]
    fn test_canonical_round_trip() {
        let original: Value =
            serde_json::from_str(r#"{"text": "café \"quoted\"", "n": 1.5, "list": [null, true]}"#)
                .unwrap();
        let event = EmittedEvent::from_value(original.clone(), 7);
        let reparsed: Value = serde_json::from_str(event.as_str()).unwrap();
        assert_eq!(reparsed, original);
        assert_eq!(event.sequence(), 7);
        assert_eq!(event.into_value(), original);
    }

    #[test]
    fn test_canonical_round_trip_awkward_values() {
        let inputs = [
            r#"{"v":1.0715660391465826e-75}"#,
            r#"{"v":-1.6039646154281830e143}"#,
            r#"{"v":5e-324}"#,
            r#"{"v":1.7976931348623157e308}"#,
            r#"{"v":0.1}"#,
            r#"{"v":2.2250738585072011e-308}"#,
            r#"{"v":9007199254740993}"#,
            r#"{"v":-0.0}"#,
            r#"{"s":"tab\tnewline\nquote\"backslash\\"}"#,
            r#"{"s":"\u0000\u001f\u007f"}"#,
            r#"{"s":"\ud83d\ude00 and 😀"}"#,
            r#"{"s":"𝄞 music"}"#,
        ];

        for input in inputs {
            let original = Record::new(1, input.as_bytes().to_vec()).parse().unwrap();
            let event = EmittedEvent::from_value(original.clone(), 0);
            let reparsed: Value = serde_json::from_str(event.as_str()).unwrap();
            assert_eq!(reparsed, original, "{} -> {}", input, event.as_str());
        }
    }

    #[test]
    fn test_float_parse_is_exact() {
        let record = Record::new(1, br#"{"v":1.0715660391465826e-75}"#.to_vec());
        let value = record.parse().unwrap();
        assert_eq!(value["v"].as_f64(), Some(1.0715660391465826e-75_f64));
    }
}
