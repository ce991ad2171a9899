//! Canonical status codes and the reserved/secure header predicates.
//!

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use common::errors::*;

/// The 17 canonical gRPC status codes, in the order that defines their
/// numeric value (`OK` is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

const CODE_TABLE: &'static [RpcCode] = &[
    RpcCode::Ok,
    RpcCode::Cancelled,
    RpcCode::Unknown,
    RpcCode::InvalidArgument,
    RpcCode::DeadlineExceeded,
    RpcCode::NotFound,
    RpcCode::AlreadyExists,
    RpcCode::PermissionDenied,
    RpcCode::ResourceExhausted,
    RpcCode::FailedPrecondition,
    RpcCode::Aborted,
    RpcCode::OutOfRange,
    RpcCode::Unimplemented,
    RpcCode::Internal,
    RpcCode::Unavailable,
    RpcCode::DataLoss,
    RpcCode::Unauthenticated,
];

impl RpcCode {
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        CODE_TABLE.get(value as usize).cloned()
    }

    pub fn name(&self) -> &'static str {
        match self {
            RpcCode::Ok => "OK",
            RpcCode::Cancelled => "CANCELLED",
            RpcCode::Unknown => "UNKNOWN",
            RpcCode::InvalidArgument => "INVALID_ARGUMENT",
            RpcCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            RpcCode::NotFound => "NOT_FOUND",
            RpcCode::AlreadyExists => "ALREADY_EXISTS",
            RpcCode::PermissionDenied => "PERMISSION_DENIED",
            RpcCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            RpcCode::FailedPrecondition => "FAILED_PRECONDITION",
            RpcCode::Aborted => "ABORTED",
            RpcCode::OutOfRange => "OUT_OF_RANGE",
            RpcCode::Unimplemented => "UNIMPLEMENTED",
            RpcCode::Internal => "INTERNAL",
            RpcCode::Unavailable => "UNAVAILABLE",
            RpcCode::DataLoss => "DATA_LOSS",
            RpcCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A `(code, message)` pair describing the outcome of a call.
///
/// Implements `Fail` so it can be propagated as a regular `rpc::Result`
/// error (the same way `http::v2::ProtocolErrorV2` is both a status-like
/// value and an `Error`) and recovered at the call boundary with
/// `Status::from_error`.
#[derive(Debug, Clone, Fail)]
#[fail(display = "rpc error {}: {}", code, message)]
pub struct Status {
    pub code: RpcCode,
    pub message: String,
}

impl Status {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(RpcCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code == RpcCode::Ok
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(RpcCode::DeadlineExceeded, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unimplemented, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unauthenticated, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unknown, message)
    }

    /// Recovers a `Status` from an arbitrary `rpc::Result` error, falling
    /// back to `UNKNOWN` for errors that did not originate as a `Status`.
    pub fn from_error(error: &Error) -> Status {
        if let Some(status) = error.downcast_ref::<Status>() {
            return status.clone();
        }

        Status::unknown(error.to_string())
    }
}

/// HTTP/2 stream-error codes that a reset stream may carry.
///
/// Mirrors the subset of `http::v2::types::ErrorCode` that is relevant to
/// mapping a transport-level reset into an RPC status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Http2ErrorCode {
    NoError,
    ProtocolError,
    InternalError,
    FlowControlError,
    SettingsTimeout,
    StreamClosed,
    FrameSizeError,
    RefusedStream,
    Cancel,
    CompressionError,
    ConnectError,
    EnhanceYourCalm,
    InadequateSecurity,
    Http11Required,
}

/// Maps an HTTP/2 stream-reset error code to an RPC status code.
/// `STREAM_CLOSED`/`HTTP_1_1_REQUIRED` are not
/// mapped (no corresponding RPC semantics); callers should treat `None`
/// as "does not apply to live calls" rather than synthesizing a status.
pub fn http2_error_to_rpc_code(code: Http2ErrorCode) -> Option<RpcCode> {
    use Http2ErrorCode::*;

    Some(match code {
        NoError | ProtocolError | InternalError | FlowControlError | SettingsTimeout
        | FrameSizeError | CompressionError | ConnectError => RpcCode::Internal,
        RefusedStream => RpcCode::Unavailable,
        Cancel => RpcCode::Cancelled,
        EnhanceYourCalm => RpcCode::ResourceExhausted,
        InadequateSecurity => RpcCode::PermissionDenied,
        StreamClosed | Http11Required => return None,
    })
}

/// Header names reserved by the protocol. Comparison is case-insensitive;
/// any name starting with `:` is
/// also reserved (HTTP/2 pseudo-headers).
pub fn is_reserved_header(name: &str) -> bool {
    if name.starts_with(':') {
        return true;
    }

    const RESERVED: &'static [&'static str] = &[
        crate::constants::CONTENT_TYPE,
        crate::constants::GRPC_ENCODING,
        crate::constants::GRPC_MESSAGE,
        crate::constants::GRPC_MESSAGE_TYPE,
        crate::constants::GRPC_STATUS,
        crate::constants::GRPC_TIMEOUT,
        crate::constants::TE,
        crate::constants::USER_AGENT,
    ];

    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Header names that carry sensitive credentials and are subject to the
/// secure-header policy when sent over a plaintext connection.
pub fn is_known_secure_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(crate::constants::AUTHORIZATION)
}

/// Process-wide policy governing known-secure headers sent over an
/// insecure connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureHeaderPolicy {
    /// Reject the call with an error.
    Fail,
    /// Silently strip the header.
    Drop,
    /// Allow the header through (not recommended).
    Warn,
}

impl SecureHeaderPolicy {
    fn to_u8(self) -> u8 {
        match self {
            SecureHeaderPolicy::Fail => 0,
            SecureHeaderPolicy::Drop => 1,
            SecureHeaderPolicy::Warn => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => SecureHeaderPolicy::Drop,
            2 => SecureHeaderPolicy::Warn,
            _ => SecureHeaderPolicy::Fail,
        }
    }
}

static SECURE_HEADER_POLICY: AtomicU8 = AtomicU8::new(0 /* Fail */);

/// Sets the process-wide secure-header policy. Intended to be called once
/// at process start-up.
pub fn set_secure_header_policy(policy: SecureHeaderPolicy) {
    SECURE_HEADER_POLICY.store(policy.to_u8(), Ordering::SeqCst);
}

pub fn secure_header_policy() -> SecureHeaderPolicy {
    SecureHeaderPolicy::from_u8(SECURE_HEADER_POLICY.load(Ordering::SeqCst))
}

/// Applies the secure-header policy to a single known-secure header being
/// sent over an insecure connection. Returns `Ok(true)` if the header
/// should still be sent, `Ok(false)` if it should be silently dropped, or
/// an error if the policy is `Fail`.
///
/// `is_secure` should be `false` only for plaintext (non-TLS) connections;
/// this function should not be called at all for TLS connections since the
/// policy only applies to insecure transports.
pub fn block_secure_header(name: &str, is_secure: bool) -> Result<bool> {
    if is_secure || !is_known_secure_header(name) {
        return Ok(true);
    }

    match secure_header_policy() {
        SecureHeaderPolicy::Fail => Err(format_err!(
            "Refusing to send known-secure header '{}' over an insecure connection",
            name
        )),
        SecureHeaderPolicy::Drop => Ok(false),
        SecureHeaderPolicy::Warn => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_table_round_trips() {
        for i in 0..17u32 {
            let code = RpcCode::from_u32(i).unwrap();
            assert_eq!(code.as_u32(), i);
        }
        assert!(RpcCode::from_u32(17).is_none());
    }

    #[test]
    fn reserved_headers_are_case_insensitive() {
        assert!(is_reserved_header("Grpc-Status"));
        assert!(is_reserved_header("GRPC-TIMEOUT"));
        assert!(is_reserved_header(":path"));
        assert!(!is_reserved_header("x-custom"));
    }

    #[test]
    fn http2_error_mapping_matches_table() {
        assert_eq!(
            http2_error_to_rpc_code(Http2ErrorCode::Cancel),
            Some(RpcCode::Cancelled)
        );
        assert_eq!(
            http2_error_to_rpc_code(Http2ErrorCode::RefusedStream),
            Some(RpcCode::Unavailable)
        );
        assert_eq!(http2_error_to_rpc_code(Http2ErrorCode::StreamClosed), None);
    }

    #[test]
    fn secure_header_policy_defaults_to_fail() {
        // NOTE: Other tests in this process may have mutated the global
        // policy; only assert the behavior for an explicitly-set policy.
        set_secure_header_policy(SecureHeaderPolicy::Fail);
        assert!(block_secure_header("Authorization", false).is_err());
        assert!(block_secure_header("Authorization", true).unwrap());

        set_secure_header_policy(SecureHeaderPolicy::Drop);
        assert_eq!(block_secure_header("authorization", false).unwrap(), false);

        set_secure_header_policy(SecureHeaderPolicy::Warn);
        assert_eq!(block_secure_header("authorization", false).unwrap(), true);

        set_secure_header_policy(SecureHeaderPolicy::Fail);
    }
}
