//! Form payload carried from the inbound request to the downstream webhook.
//!
//! # Design Decisions
//! - Keys map to a list of values so repeated keys survive the round trip
//! - Values for one key keep their submission order
//! - Distinct keys are held sorted; encoding is deterministic

use std::collections::BTreeMap;
use thiserror::Error;
use url::form_urlencoded;

/// Media type of the outbound body and of accepted inbound bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Errors produced while reading inbound form data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    /// Request body could not be read (aborted, too large).
    #[error("failed to read request body: {0}")]
    Body(String),

    /// Body or query is not valid UTF-8.
    #[error("form data is not valid UTF-8")]
    InvalidUtf8,

    /// A `%` not followed by two hex digits.
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    /// `Content-Type` header present but unreadable.
    #[error("malformed Content-Type header")]
    MalformedContentType,

    /// Multipart body that could not be decoded.
    #[error("invalid multipart form: {0}")]
    Multipart(String),

    /// Content type that carries form data we do not decode.
    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(String),
}

/// Ordered multi-map of form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    ///
    /// Rejects malformed percent escapes instead of passing them through, so a
    /// corrupted upload is reported rather than forwarded.
    pub fn parse(input: &[u8]) -> Result<Self, FormError> {
        let mut payload = Self::new();
        payload.extend_from_urlencoded(input)?;
        Ok(payload)
    }

    /// Append all pairs found in `input` after the existing values.
    pub fn extend_from_urlencoded(&mut self, input: &[u8]) -> Result<(), FormError> {
        let text = std::str::from_utf8(input).map_err(|_| FormError::InvalidUtf8)?;
        validate_escapes(text)?;
        for (key, value) in form_urlencoded::parse(text.as_bytes()) {
            self.append(key.into_owned(), value.into_owned());
        }
        Ok(())
    }

    /// Add one value for `key`, after any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.fields.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(key, value)` pairs in encoding order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }

    /// Encode as `key=value` pairs joined by `&`.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.pairs() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for FormPayload
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Self::new();
        for (key, value) in iter {
            payload.append(key, value);
        }
        payload
    }
}

fn validate_escapes(text: &str) -> Result<(), FormError> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(FormError::InvalidEscape(
                    String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_keep_value_order() {
        let payload = FormPayload::parse(b"temp=72&humidity=55&humidity=54").unwrap();
        assert_eq!(payload.get("humidity").unwrap(), ["55", "54"]);
        assert_eq!(payload.get("temp").unwrap(), ["72"]);
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_encode_groups_keys() {
        let payload: FormPayload =
            [("temp", "72"), ("humidity", "55"), ("humidity", "54")].into_iter().collect();
        assert_eq!(payload.encode(), "humidity=55&humidity=54&temp=72");
    }

    #[test]
    fn test_encode_percent_encodes() {
        let payload: FormPayload = [("station type", "GW1000 V1.6&x=1")].into_iter().collect();
        let encoded = payload.encode();
        assert_eq!(encoded, "station+type=GW1000+V1.6%26x%3D1");
        assert_eq!(FormPayload::parse(encoded.as_bytes()).unwrap(), payload);
    }

    #[test]
    fn test_empty_input() {
        let payload = FormPayload::parse(b"").unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.encode(), "");
    }

    #[test]
    fn test_key_without_value() {
        let payload = FormPayload::parse(b"flag&x=").unwrap();
        assert_eq!(payload.get("flag").unwrap(), [""]);
        assert_eq!(payload.get("x").unwrap(), [""]);
    }

    #[test]
    fn test_invalid_escape_rejected() {
        assert_eq!(
            FormPayload::parse(b"temp=%zz").unwrap_err(),
            FormError::InvalidEscape("%zz".into())
        );
        assert_eq!(
            FormPayload::parse(b"temp=7%2").unwrap_err(),
            FormError::InvalidEscape("%2".into())
        );
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert_eq!(FormPayload::parse(&[0x74, 0x3d, 0xff]).unwrap_err(), FormError::InvalidUtf8);
    }

    #[test]
    fn test_extend_appends_after_existing() {
        let mut payload = FormPayload::parse(b"a=1").unwrap();
        payload.extend_from_urlencoded(b"a=2&b=3").unwrap();
        assert_eq!(payload.get("a").unwrap(), ["1", "2"]);
        assert_eq!(payload.get("b").unwrap(), ["3"]);
    }
}
