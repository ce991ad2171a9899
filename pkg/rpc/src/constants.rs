//! Header names and wire-level constants reserved by the protocol.
//!
//! Mirrors the bare `&'static [u8]`/`&'static str` constant style used in
//! `http::header` and `http::v2::headers`.

pub const GRPC_CONTENT_TYPE: &'static str = "application/grpc";

pub const CONTENT_TYPE: &'static str = "content-type";
pub const GRPC_ENCODING: &'static str = "grpc-encoding";
pub const GRPC_MESSAGE: &'static str = "grpc-message";
pub const GRPC_MESSAGE_TYPE: &'static str = "grpc-message-type";
pub const GRPC_STATUS: &'static str = "grpc-status";
pub const GRPC_TIMEOUT: &'static str = "grpc-timeout";
pub const TE: &'static str = "te";
pub const USER_AGENT: &'static str = "user-agent";

pub const AUTHORIZATION: &'static str = "authorization";

/// Suffix appended to a header name whose value was base64-encoded because
/// it contained non-ASCII/binary data.
pub const BIN_SUFFIX: &'static str = "-bin";

pub const DEFAULT_HOST: &'static str = "localhost";
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Maximum numeric part allowed in an encoded `grpc-timeout` interval.
pub const MAX_INTERVAL_AMOUNT: u64 = 100_000_000 - 1;
