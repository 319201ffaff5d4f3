//! The format-independent exchange shape: `{"file_format", "contents"}`,
//! optionally percent-encoded behind a `sleep-diary=` URL prefix.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConvertError;

/// Prefix of the URL form.
pub const URL_PREFIX: &str = "sleep-diary=";

/// A serialized diary of any format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub file_format: String,
    pub contents: Value,
}

impl Envelope {
    /// Reads an envelope out of a JSON value, if it has that shape.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let file_format = object.get("file_format")?.as_str()?;
        Some(Self {
            file_format: file_format.to_string(),
            contents: object.get("contents").cloned().unwrap_or(Value::Null),
        })
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::json!({
            "file_format": self.file_format,
            "contents": self.contents,
        })
    }

    /// `sleep-diary=<percent-encoded JSON>`.
    pub fn to_url(&self) -> Result<String, ConvertError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{URL_PREFIX}{}", percent_encode(&json)))
    }

    /// Inverse of [`Envelope::to_url`].
    pub fn from_url(url: &str) -> Result<Self, ConvertError> {
        let encoded = url
            .trim()
            .strip_prefix(URL_PREFIX)
            .ok_or_else(|| ConvertError::Url(format!("missing {URL_PREFIX} prefix")))?;
        let json = percent_decode(encoded)?;
        let value: Value = serde_json::from_str(&json)?;
        Self::from_value(&value).ok_or_else(|| ConvertError::Url("not a diary envelope".into()))
    }
}

/// Encodes everything except the characters `encodeURIComponent` leaves alone.
#[must_use]
pub fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Decodes `%XX` escapes. `+` is left as-is.
pub fn percent_decode(text: &str) -> Result<String, ConvertError> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ConvertError::Url(format!("bad escape at offset {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| ConvertError::Url("escapes are not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn percent_encoding_matches_uri_component() {
        assert_eq!(percent_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(percent_encode("{\"x\":1}"), "%7B%22x%22%3A1%7D");
        assert_eq!(percent_encode("é"), "%C3%A9");
        assert_eq!(percent_encode("(ok)!"), "(ok)!");
    }

    #[test]
    fn percent_decoding_rejects_truncated_escapes() {
        assert_eq!(percent_decode("%C3%A9x").unwrap(), "éx");
        assert!(percent_decode("abc%4").is_err());
        assert!(percent_decode("%zz").is_err());
        assert!(percent_decode("%+F").is_err());
    }

    #[test]
    fn url_form_round_trips() {
        let envelope = Envelope {
            file_format: "Standard".into(),
            contents: json!({"records": [{"status": "asleep", "start": 0, "end": 1}]}),
        };
        let url = envelope.to_url().unwrap();
        assert!(url.starts_with(URL_PREFIX));
        assert_eq!(Envelope::from_url(&url).unwrap(), envelope);
    }

    #[test]
    fn from_value_requires_file_format() {
        assert!(Envelope::from_value(&json!({"contents": {}})).is_none());
        assert!(Envelope::from_value(&json!([1, 2])).is_none());
        let envelope = Envelope::from_value(&json!({"file_format": "X"})).unwrap();
        assert_eq!(envelope.contents, Value::Null);
    }
}
