pub const CONNECTION: &'static [u8] = b"Connection";

pub const KEEP_ALIVE: &'static [u8] = b"Keep-Alive";

pub const TRANSFER_ENCODING: &'static [u8] = b"Transfer-Encoding";

pub const CONTENT_LENGTH: &'static [u8] = b"Content-Length";

pub const CONTENT_ENCODING: &'static [u8] = b"Content-Encoding";

pub const CONTENT_TYPE: &'static [u8] = b"Content-Type";

use common::errors::*;
use parsing::ascii::AsciiString;
use parsing::opaque::OpaqueString;

/// A single name/value header pair.
///
/// The name is restricted to ASCII (per RFC 7230 `field-name`). The value is
/// an opaque byte string: callers that need binary-safe values are expected
/// to base64-encode them and use a `-bin` suffixed name themselves (see
/// `rpc::metadata`).
#[derive(Clone, Debug)]
pub struct Header {
    pub name: AsciiString,
    pub value: OpaqueString,
}

impl Header {
    pub fn new<N: ToHeaderName, V: ToHeaderValue>(name: N, value: V) -> Result<Self> {
        let name = name.to_header_name()?;
        let value = value.to_header_value(&name)?;
        Ok(Self { name, value })
    }
}

/// An ordered collection of headers (or trailers) as seen on the wire.
#[derive(Clone, Debug, Default)]
pub struct Headers {
    pub raw_headers: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self { raw_headers: vec![] }
    }

    pub fn find(&self, name: &str) -> Vec<&Header> {
        self.raw_headers
            .iter()
            .filter(|h| h.name.eq_ignore_case(name.as_bytes()))
            .collect()
    }

    /// Returns the value of the first header with the given name, if any.
    pub fn find_one(&self, name: &str) -> Result<Option<&Header>> {
        let mut it = self.find(name).into_iter();
        let first = it.next();
        if it.next().is_some() {
            return Err(format_err!("Multiple '{}' headers present", name));
        }
        Ok(first)
    }

    pub fn push(&mut self, header: Header) {
        self.raw_headers.push(header);
    }
}

impl From<Vec<Header>> for Headers {
    fn from(raw_headers: Vec<Header>) -> Self {
        Self { raw_headers }
    }
}

impl IntoIterator for Headers {
    type Item = Header;
    type IntoIter = std::vec::IntoIter<Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.raw_headers.into_iter()
    }
}

/// Converts a convenience type (usually `&str`/`String`) into a validated
/// header name.
pub trait ToHeaderName {
    fn to_header_name(self) -> Result<AsciiString>;
}

impl<T: AsRef<[u8]>> ToHeaderName for T {
    fn to_header_name(self) -> Result<AsciiString> {
        let name = AsciiString::from(self.as_ref())?;
        if name.as_str().is_empty() {
            return Err(err_msg("Header name can't be empty"));
        }
        Ok(name)
    }
}

/// Converts a convenience type into a validated header value.
pub trait ToHeaderValue {
    fn to_header_value(self, name: &AsciiString) -> Result<OpaqueString>;
}

impl ToHeaderValue for OpaqueString {
    fn to_header_value(self, _name: &AsciiString) -> Result<OpaqueString> {
        Ok(self)
    }
}

impl ToHeaderValue for Vec<u8> {
    fn to_header_value(self, _name: &AsciiString) -> Result<OpaqueString> {
        Ok(OpaqueString::from(self))
    }
}

impl<'a> ToHeaderValue for &'a str {
    fn to_header_value(self, _name: &AsciiString) -> Result<OpaqueString> {
        Ok(OpaqueString::from(self.as_bytes().to_vec()))
    }
}

impl ToHeaderValue for String {
    fn to_header_value(self, _name: &AsciiString) -> Result<OpaqueString> {
        Ok(OpaqueString::from(self.into_bytes()))
    }
}
