//! Server-side call engine (§4.3 "Server call engine").

use std::sync::Arc;
use std::time::Duration;

use common::async_std::channel;
use common::async_std::future;
use common::async_std::sync::Mutex;
use common::bytes::Bytes;
use common::errors::*;
use common::eventually::Eventually;
use parsing::opaque::OpaqueString;

use crate::client_types::Cancellable;
use crate::constants::{CONTENT_TYPE, GRPC_CONTENT_TYPE, GRPC_MESSAGE, GRPC_STATUS, GRPC_TIMEOUT};
use crate::duration::interval_to_micros;
use crate::message::encode_message;
use crate::metadata::{decode_metadata, find_reserved_header, remove_bin_values, Metadata, MetadataValue};
use crate::server_types::{ResponseState, ServerStreamingRequest, ServerStreamingResponse};
use crate::service::{MarshalFn, UnmarshalFn};
use crate::status::{block_secure_header, is_known_secure_header, RpcCode, Status};

use http::body::Body;
use http::header::{Header, Headers};
use http::message::HTTP_V2_0;
use http::request::Request;
use http::response::{Response, ResponseHead};
use http::status_code;

/// Drives one accepted call end to end: parses metadata and the deadline,
/// then spawns `handler` against a fresh request/response pair as a
/// background task and returns the streaming HTTP/2 response as soon as
/// headers are committed, rather than once the whole call finishes — a
/// long-lived or heartbeat-style handler must be able to stream header and
/// data bytes to the client while it is still running (§4.3 "Server call
/// engine"). The deadline timer races the spawned handler independently,
/// mirroring how the client engine's `run_call` races its own deadline
/// against `run_call_body` (`channel.rs`).
///
/// `is_secure` reflects whether the accepting connection negotiated TLS; it
/// is used to apply the secure-header policy (§3 "Known-secure header set")
/// to the inbound metadata the same way the client engine applies it to
/// outbound headers: a known-secure header arriving over a plaintext
/// connection is rejected, dropped, or passed through, per the process-wide
/// policy.
///
/// `handler` returns `Result<()>` rather than `()`: a propagated `Err`
/// converts to `response.rpcCode = UNKNOWN` unless the handler already set
/// a more specific code (§4.3 "Error handling", §7 "Application errors").
pub async fn serve_call<Req, Res, F, Fut>(
    request: Request,
    is_secure: bool,
    unmarshal: Option<UnmarshalFn<Req>>,
    marshal: Option<MarshalFn<Res>>,
    handler: F,
) -> Response
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: FnOnce(ServerStreamingRequest<Req>, ServerStreamingResponse<Res>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let headers = &request.head.headers;

    match find_reserved_header(headers, CONTENT_TYPE) {
        Ok(Some(value)) if value.starts_with(GRPC_CONTENT_TYPE) => {}
        _ => return status_only_response(RpcCode::Unknown, "Missing or invalid content-type"),
    }

    let metadata = match decode_metadata(headers) {
        Ok(m) => m,
        Err(e) => return status_only_response(RpcCode::Internal, format!("Malformed metadata: {}", e)),
    };

    let metadata = match apply_secure_header_policy(metadata, is_secure) {
        Ok(m) => m,
        Err(e) => return status_only_response(RpcCode::Unauthenticated, e.to_string()),
    };

    let deadline = match find_reserved_header(headers, GRPC_TIMEOUT) {
        Ok(Some(raw)) => match interval_to_micros(raw) {
            Ok(micros) => Some(Duration::from_micros(micros)),
            Err(_) => {
                return status_only_response(RpcCode::Internal, "Malformed grpc-timeout header")
            }
        },
        Ok(None) => None,
        Err(e) => return status_only_response(RpcCode::Internal, e.to_string()),
    };

    let cancelled: Arc<Mutex<Option<Status>>> = Arc::new(Mutex::new(None));
    let children: Arc<Mutex<Vec<Box<dyn Cancellable>>>> = Arc::new(Mutex::new(Vec::new()));

    let request_handle = ServerStreamingRequest::new(
        metadata,
        request.body,
        unmarshal,
        cancelled.clone(),
        children.clone(),
    );

    let (message_sender, message_receiver) = channel::unbounded::<Bytes>();
    let state = Arc::new(Mutex::new(ResponseState::new()));
    let headers_ready: Arc<Eventually<Metadata>> = Arc::new(Eventually::new());
    let response_handle = ServerStreamingResponse::new(
        marshal,
        message_sender.clone(),
        state.clone(),
        headers_ready.clone(),
    );
    drop(message_sender);

    let run = handler(request_handle, response_handle);

    let state_for_task = state.clone();
    let cancelled_for_task = cancelled.clone();
    let children_for_task = children.clone();
    let headers_ready_for_task = headers_ready.clone();

    common::async_std::task::spawn(async move {
        let (timed_out, handler_result) = match deadline {
            Some(d) => match future::timeout(d, run).await {
                Ok(result) => (false, Some(result)),
                Err(_) => (true, None),
            },
            None => (false, Some(run.await)),
        };

        if timed_out {
            let status = Status::deadline_exceeded("Deadline exceeded");
            *cancelled_for_task.lock().await = Some(status.clone());
            for child in children_for_task.lock().await.iter() {
                child.cancel(status.clone());
            }

            let mut state = state_for_task.lock().await;
            state.rpc_code = status.code;
            state.rpc_message = status.message;
        } else if let Some(Err(e)) = handler_result {
            let mut state = state_for_task.lock().await;
            if state.rpc_code == RpcCode::Ok {
                state.rpc_code = RpcCode::Unknown;
                if state.rpc_message.is_empty() {
                    state.rpc_message = e.to_string();
                }
            }
        }

        // The handler may never have called `send()` (an immediate error,
        // or a unary-shaped handler that only sets a status) — commit
        // whatever headers were staged now, so `headers_ready` always
        // resolves exactly once and the already-returned `Response` isn't
        // left hanging.
        let mut state = state_for_task.lock().await;
        if !state.headers_sent {
            state.headers_sent = true;
            let snapshot = state.headers.clone();
            drop(state);
            let _ = headers_ready_for_task.set(snapshot).await;
        }
    });

    let committed_headers = headers_ready.get().await;

    let mut response_headers = Headers::new();
    response_headers
        .push(Header::new(CONTENT_TYPE, GRPC_CONTENT_TYPE).unwrap());

    for (name, value) in committed_headers.iter() {
        let (wire_name, wire_value) = remove_bin_values(name, value);
        if let Ok(header) = Header::new(wire_name, wire_value) {
            response_headers.push(header);
        }
    }

    Response {
        head: ResponseHead {
            version: HTTP_V2_0,
            status_code: status_code::OK,
            reason: OpaqueString::from(""),
            headers: response_headers,
        },
        body: Box::new(ServerResponseBody {
            receiver: message_receiver,
            state,
        }),
    }
}

/// Applies the secure-header policy (§3) to every known-secure header
/// found in inbound metadata on a plaintext connection: `FAIL` rejects the
/// call, `DROP` strips the entry, `WARN` passes it through unchanged. A
/// no-op on a TLS connection.
fn apply_secure_header_policy(metadata: Metadata, is_secure: bool) -> Result<Metadata> {
    if is_secure {
        return Ok(metadata);
    }

    let mut filtered = Metadata::new();
    for (name, value) in metadata.iter() {
        if is_known_secure_header(name) {
            if block_secure_header(name, is_secure)? {
                filtered.add(name.clone(), value.clone());
            }
        } else {
            filtered.add(name.clone(), value.clone());
        }
    }

    Ok(filtered)
}

/// Builds a Trailers-Only response (§3.3): the body carries no messages and
/// the terminal status is in the header block instead of a trailer block.
pub fn status_only_response(code: RpcCode, message: impl Into<String>) -> Response {
    let mut headers = Headers::new();
    headers.push(Header::new(CONTENT_TYPE, GRPC_CONTENT_TYPE).unwrap());

    let message = message.into();
    let (status_name, status_value) =
        remove_bin_values(GRPC_STATUS, &MetadataValue::Ascii(code.as_u32().to_string()));
    headers.push(Header::new(status_name, status_value).unwrap());

    if !message.is_empty() {
        let (message_name, message_value) =
            remove_bin_values(GRPC_MESSAGE, &MetadataValue::Ascii(message));
        headers.push(Header::new(message_name, message_value).unwrap());
    }

    Response {
        head: ResponseHead {
            version: HTTP_V2_0,
            status_code: status_code::OK,
            reason: OpaqueString::from(""),
            headers,
        },
        body: http::body::EmptyBody(),
    }
}

/// Streams outbound message frames from the handler's channel, then
/// produces the trailer block once the channel is drained and closed
/// (which only happens after the handler task has finalized `state`).
struct ServerResponseBody {
    receiver: channel::Receiver<Bytes>,
    state: Arc<Mutex<ResponseState>>,
}

#[async_trait]
impl Body for ServerResponseBody {
    fn len(&self) -> Option<usize> {
        None
    }

    fn has_trailers(&self) -> bool {
        true
    }

    async fn trailers(&mut self) -> Result<Option<Headers>> {
        let state = self.state.lock().await;

        let mut headers = Headers::new();
        for (name, value) in state.trailers.iter() {
            let (wire_name, wire_value) = remove_bin_values(name, value);
            headers.push(Header::new(wire_name, wire_value)?);
        }

        if state.trailers.get(GRPC_STATUS).is_empty() {
            headers.push(Header::new(
                GRPC_STATUS,
                state.rpc_code.as_u32().to_string(),
            )?);
        }

        if !state.rpc_message.is_empty() && state.trailers.get(GRPC_MESSAGE).is_empty() {
            let (name, value) =
                remove_bin_values(GRPC_MESSAGE, &MetadataValue::Ascii(state.rpc_message.clone()));
            headers.push(Header::new(name, value)?);
        }

        Ok(Some(headers))
    }
}

#[async_trait]
impl common::io::Readable for ServerResponseBody {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        // Messages are handed to the underlying HTTP/2 stream as whole
        // frames; partial reads across frame boundaries are handled by
        // `MessageReader` on the receiving end, so here we only ever need
        // to copy at most one queued frame per call.
        match self.receiver.recv().await {
            Ok(frame) => {
                let n = std::cmp::min(buf.len(), frame.len());
                buf[..n].copy_from_slice(&frame[..n]);
                if n < frame.len() {
                    return Err(err_msg(
                        "Read buffer smaller than one gRPC message frame is not supported",
                    ));
                }
                Ok(n)
            }
            Err(_) => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    fn echo_marshal() -> MarshalFn<Vec<u8>> {
        StdArc::new(|v: &Vec<u8>| Ok(v.clone()))
    }

    fn echo_unmarshal() -> UnmarshalFn<Vec<u8>> {
        StdArc::new(|b: &[u8]| Ok(b.to_vec()))
    }

    fn grpc_request(body: Vec<u8>) -> Request {
        let mut headers = Headers::new();
        headers.push(Header::new(CONTENT_TYPE, GRPC_CONTENT_TYPE).unwrap());
        Request {
            head: http::request::RequestHead {
                method: http::method::Method::POST,
                uri: http::uri::Uri {
                    scheme: None,
                    authority: None,
                    path: "/Test/Echo".to_string(),
                    query: None,
                    fragment: None,
                },
                version: HTTP_V2_0,
                headers,
            },
            body: http::body::BodyFromData(body),
        }
    }

    #[test]
    fn status_only_response_carries_code_and_message() {
        common::async_std::task::block_on(async {
            let mut response = status_only_response(RpcCode::NotFound, "no such widget");
            assert!(response.ok());
            let trailers = response.body.trailers().await.unwrap();
            assert!(trailers.is_none());

            let status = response
                .head
                .headers
                .find_one("grpc-status")
                .unwrap()
                .unwrap();
            assert_eq!(status.value.to_utf8_str().unwrap(), "5");

            let message = response
                .head
                .headers
                .find_one("grpc-message")
                .unwrap()
                .unwrap();
            assert_eq!(message.value.to_utf8_str().unwrap(), "no such widget");
        });
    }

    #[test]
    fn serve_call_runs_handler_and_emits_ok_trailers() {
        common::async_std::task::block_on(async {
            let request = grpc_request(encode_message(b"hello"));

            let response = serve_call(
                request,
                false,
                Some(echo_unmarshal()),
                Some(echo_marshal()),
                |req, res| async move {
                    let message = req.recv().await?;
                    res.send(&message.unwrap()).await?;
                    Ok(())
                },
            )
            .await;

            assert!(response.ok());
        });
    }

    #[test]
    fn serve_call_passes_raw_bytes_without_a_marshaller() {
        common::async_std::task::block_on(async {
            let request = grpc_request(encode_message(b"hello"));

            let response = serve_call(
                request,
                false,
                None,
                None,
                |req: ServerStreamingRequest<Vec<u8>>, res: ServerStreamingResponse<Vec<u8>>| async move {
                    let message = req.recv().await?;
                    res.send(&message.unwrap()).await?;
                    Ok(())
                },
            )
            .await;

            assert!(response.ok());
        });
    }

    #[test]
    fn handler_error_defaults_to_unknown_status() {
        common::async_std::task::block_on(async {
            let request = grpc_request(encode_message(b"hello"));

            let mut response = serve_call(
                request,
                false,
                Some(echo_unmarshal()),
                Some(echo_marshal()),
                |_req, _res| async move { Err(err_msg("handler blew up")) },
            )
            .await;

            let trailers = response.body.trailers().await.unwrap().unwrap();
            let status = trailers.find_one("grpc-status").unwrap().unwrap();
            assert_eq!(status.value.to_utf8_str().unwrap(), "2");
        });
    }

    #[test]
    fn handler_error_does_not_override_an_explicit_status() {
        common::async_std::task::block_on(async {
            let request = grpc_request(encode_message(b"hello"));

            let mut response = serve_call(
                request,
                false,
                Some(echo_unmarshal()),
                Some(echo_marshal()),
                |_req, res| async move {
                    res.set_status(RpcCode::InvalidArgument, "bad input").await;
                    Err(err_msg("handler blew up after setting a status"))
                },
            )
            .await;

            let trailers = response.body.trailers().await.unwrap().unwrap();
            let status = trailers.find_one("grpc-status").unwrap().unwrap();
            assert_eq!(status.value.to_utf8_str().unwrap(), "3");
        });
    }

    #[test]
    fn set_header_is_visible_on_the_response_head() {
        common::async_std::task::block_on(async {
            let request = grpc_request(encode_message(b"hello"));

            let response = serve_call(
                request,
                false,
                Some(echo_unmarshal()),
                Some(echo_marshal()),
                |req, res| async move {
                    res.set_header("x-trace", "abc123").await?;
                    let message = req.recv().await?;
                    res.send(&message.unwrap()).await?;
                    Ok(())
                },
            )
            .await;

            let header = response.head.headers.find_one("x-trace").unwrap().unwrap();
            assert_eq!(header.value.to_utf8_str().unwrap(), "abc123");
        });
    }

    fn grpc_request_with_late_timeout(body: Vec<u8>) -> Request {
        let mut headers = Headers::new();
        headers.push(Header::new(CONTENT_TYPE, GRPC_CONTENT_TYPE).unwrap());

        let mut trailers = Headers::new();
        trailers.push(Header::new(GRPC_TIMEOUT, "300m").unwrap());

        Request {
            head: http::request::RequestHead {
                method: http::method::Method::POST,
                uri: http::uri::Uri {
                    scheme: None,
                    authority: None,
                    path: "/Test/Echo".to_string(),
                    query: None,
                    fragment: None,
                },
                version: HTTP_V2_0,
                headers,
            },
            body: http::body::WithTrailers(http::body::BodyFromData(body), trailers),
        }
    }

    #[test]
    fn grpc_timeout_in_a_trailer_is_a_protocol_violation() {
        common::async_std::task::block_on(async {
            let request = grpc_request_with_late_timeout(encode_message(b"hello"));

            let response = serve_call(
                request,
                false,
                Some(echo_unmarshal()),
                Some(echo_marshal()),
                |req, res| async move {
                    let first = req.recv().await?;
                    res.send(&first.unwrap()).await?;
                    // The second recv() drains the trailer and should observe the violation.
                    let violation = req.recv().await;
                    assert!(violation.is_err());
                    Ok(())
                },
            )
            .await;

            assert!(response.ok());
        });
    }
}
