//! Binary header transformation (`removeBinValues`) and the user-visible
//! `Metadata` map (§4.1 "Binary header transformation", §3 "Reserved header
//! set").

use common::base64;
use common::errors::*;
use http::header::{Header, Headers};

use crate::constants::BIN_SUFFIX;
use crate::status::is_reserved_header;

/// A single metadata value: either a human-readable string or raw bytes.
///
/// A header/trailer whose value came across the wire with a `-bin` suffixed
/// name is always decoded to `Binary`; anything else is `Ascii`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Ascii(String),
    Binary(Vec<u8>),
}

impl MetadataValue {
    fn needs_bin_encoding(&self) -> bool {
        match self {
            MetadataValue::Ascii(s) => !s.is_ascii(),
            MetadataValue::Binary(_) => true,
        }
    }

    fn raw_bytes(&self) -> Vec<u8> {
        match self {
            MetadataValue::Ascii(s) => s.as_bytes().to_vec(),
            MetadataValue::Binary(b) => b.clone(),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Ascii(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Ascii(s)
    }
}

impl From<Vec<u8>> for MetadataValue {
    fn from(b: Vec<u8>) -> Self {
        MetadataValue::Binary(b)
    }
}

/// Non-reserved headers/trailers exposed to the application. Preserves
/// insertion order and allows repeated keys (a "sequence" value in §4.1's
/// terms is just several entries under the same name).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<(String, MetadataValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<MetadataValue>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Vec<&MetadataValue> {
        self.entries
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, MetadataValue)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Transforms a single `(name, value)` pair the way `removeBinValues` does:
/// a value that is binary or contains non-ASCII bytes is base64-encoded and
/// the header name gets a `-bin` suffix; an all-ASCII value passes through
/// unchanged (Testable property I3/I4 in `spec.md` §8).
pub fn remove_bin_values(name: &str, value: &MetadataValue) -> (String, Vec<u8>) {
    if value.needs_bin_encoding() {
        (
            format!("{}{}", name, BIN_SUFFIX),
            base64::encode(value.raw_bytes()).into_bytes(),
        )
    } else {
        (name.to_string(), value.raw_bytes())
    }
}

/// Serializes a `Metadata` map into wire headers, applying
/// `remove_bin_values` to every entry.
///
/// Entries are grouped by name first: a repeated-key "sequence" (§4.1) must
/// transform as a unit, so if any element under a name needs bin-encoding,
/// every element under that name is renamed/base64-encoded, not just the
/// ones that individually require it. Otherwise a peer reassembling the
/// sequence from (otherwise identically-named) headers would see some
/// entries under `name` and others under `name-bin`.
pub fn encode_metadata(metadata: &Metadata) -> Result<Headers> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<&MetadataValue>> =
        std::collections::HashMap::new();

    for (name, value) in metadata.iter() {
        let key = name.to_ascii_lowercase();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_insert_with(Vec::new).push(value);
    }

    let mut headers = Headers::new();
    for key in order {
        let values = &groups[&key];
        let needs_bin = values.iter().any(|v| v.needs_bin_encoding());
        for value in values {
            let (wire_name, wire_value) = if needs_bin {
                (
                    format!("{}{}", key, BIN_SUFFIX),
                    base64::encode(value.raw_bytes()).into_bytes(),
                )
            } else {
                (key.clone(), value.raw_bytes())
            };
            headers.push(Header::new(wire_name, wire_value)?);
        }
    }
    Ok(headers)
}

/// Parses the non-reserved subset of `headers` into a `Metadata` map,
/// base64-decoding any `-bin` suffixed name back into its real name.
pub fn decode_metadata(headers: &Headers) -> Result<Metadata> {
    let mut metadata = Metadata::new();

    for header in &headers.raw_headers {
        let raw_name = header.name.as_str();
        if is_reserved_header(raw_name) {
            continue;
        }

        if let Some(real_name) = raw_name
            .to_ascii_lowercase()
            .strip_suffix(BIN_SUFFIX)
            .map(|s| s.to_string())
        {
            let decoded = base64::decode(header.value.to_ascii_str().unwrap_or_default())
                .map_err(|e| format_err!("Invalid base64 in '{}' header: {}", raw_name, e))?;
            metadata.add(real_name, MetadataValue::Binary(decoded));
        } else {
            let value = header
                .value
                .to_utf8_str()
                .map_err(|_| format_err!("Non-UTF8 value in '{}' header", raw_name))?;
            metadata.add(raw_name.to_string(), MetadataValue::Ascii(value.to_string()));
        }
    }

    Ok(metadata)
}

/// Looks up a single reserved header's raw string value directly (bypassing
/// the `Metadata` filter, which excludes reserved headers by construction).
pub fn find_reserved_header<'a>(headers: &'a Headers, name: &str) -> Result<Option<&'a str>> {
    match headers.find_one(name)? {
        Some(h) => Ok(Some(h.value.to_utf8_str()?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_values_pass_through_unchanged() {
        let (name, value) = remove_bin_values("bt1", &MetadataValue::Ascii("hello".into()));
        assert_eq!(name, "bt1");
        assert_eq!(value, b"hello");
    }

    #[test]
    fn binary_values_get_bin_suffix_and_base64() {
        let raw = "½ + ¼ = ¾".as_bytes().to_vec();
        let (name, value) = remove_bin_values("bt1", &MetadataValue::Ascii(
            String::from_utf8(raw.clone()).unwrap(),
        ));
        assert_eq!(name, "bt1-bin");
        assert_eq!(base64::decode(&value).unwrap(), raw);
    }

    #[test]
    fn explicit_binary_value_always_gets_bin_suffix() {
        let (name, value) = remove_bin_values("trace", &MetadataValue::Binary(vec![0, 1, 2]));
        assert_eq!(name, "trace-bin");
        assert_eq!(base64::decode(&value).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn encode_metadata_keeps_a_mixed_sequence_consistently_named() {
        let mut metadata = Metadata::new();
        metadata.add("bt1", MetadataValue::Ascii("a".into()));
        metadata.add("bt1", MetadataValue::Binary(vec![1, 2, 3]));
        metadata.add("bt1", MetadataValue::Ascii("b".into()));

        let headers = encode_metadata(&metadata).unwrap();
        let values: Vec<_> = headers
            .raw_headers
            .iter()
            .map(|h| h.name.as_str().to_string())
            .collect();
        assert_eq!(values, vec!["bt1-bin", "bt1-bin", "bt1-bin"]);
    }

    #[test]
    fn decode_round_trips_binary_metadata() {
        let mut headers = Headers::new();
        let raw = "½ + ¼ = ¾".as_bytes().to_vec();
        headers
            .push(Header::new("bt1-bin", base64::encode(&raw)).unwrap());
        headers.push(Header::new("grpc-status", "0").unwrap());

        let metadata = decode_metadata(&headers).unwrap();
        assert_eq!(
            metadata.get("bt1"),
            vec![&MetadataValue::Binary(raw)]
        );
        // Reserved headers never show up as metadata.
        assert!(metadata.get("grpc-status").is_empty());
    }
}
