//! Per-call request/response handles on the server side (§4.3).

use std::sync::Arc;

use common::async_std::channel;
use common::async_std::sync::Mutex;
use common::bytes::Bytes;
use common::errors::*;
use common::eventually::Eventually;
use http::body::Body;

use crate::client_types::Cancellable;
use crate::constants::GRPC_TIMEOUT;
use crate::message::MessageReader;
use crate::metadata::{find_reserved_header, Metadata, MetadataValue};
use crate::service::{unmarshal_or_raw, UnmarshalFn};
use crate::status::{RpcCode, Status};

/// The inbound half of an accepted call (§4.3 "request"): metadata parsed
/// once from the first header block, then zero-or-more unmarshalled
/// messages, then end-of-stream or cancellation.
pub struct ServerStreamingRequest<Req> {
    metadata: Metadata,
    reader: Mutex<Option<MessageReader<Box<dyn Body>>>>,
    unmarshal: Option<UnmarshalFn<Req>>,
    cancelled: Arc<Mutex<Option<Status>>>,
    children: Arc<Mutex<Vec<Box<dyn Cancellable>>>>,
}

impl<Req> ServerStreamingRequest<Req> {
    pub(crate) fn new(
        metadata: Metadata,
        body: Box<dyn Body>,
        unmarshal: Option<UnmarshalFn<Req>>,
        cancelled: Arc<Mutex<Option<Status>>>,
        children: Arc<Mutex<Vec<Box<dyn Cancellable>>>>,
    ) -> Self {
        Self {
            metadata,
            reader: Mutex::new(Some(MessageReader::new(body))),
            unmarshal,
            cancelled,
            children,
        }
    }

    /// The non-reserved headers sent with the first header block.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Receives the next inbound message. Returns `Ok(None)` on a clean
    /// upstream half-close, or `Err(Status)` if the call was cancelled
    /// (`CANCELLED`/`DEADLINE_EXCEEDED`, set by the deadline timer or a
    /// peer reset), a frame failed to decode (`INTERNAL`), or the upstream
    /// sent `grpc-timeout` in its trailer block — a protocol violation
    /// (§4.3 "Start": "`grpc-timeout` in a trailer ... triggers the same
    /// reset" as a malformed one in the header block).
    pub async fn recv(&self) -> Result<Option<Req>> {
        if let Some(status) = self.cancelled.lock().await.clone() {
            return Err(status.into());
        }

        let mut reader_slot = self.reader.lock().await;
        let reader = match reader_slot.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        let message = reader
            .read_message()
            .await
            .map_err(|_| Status::internal("Failed to decode request frame"))?;

        match message {
            Some(message) => Ok(Some(unmarshal_or_raw(&self.unmarshal, &message.payload)?)),
            None => {
                let body = reader_slot.take().unwrap().into_inner();
                drop(reader_slot);
                self.check_trailing_timeout(body).await?;
                Ok(None)
            }
        }
    }

    async fn check_trailing_timeout(&self, mut body: Box<dyn Body>) -> Result<()> {
        let trailers = body.trailers().await.unwrap_or(None);
        let has_timeout = match &trailers {
            Some(trailers) => find_reserved_header(trailers, GRPC_TIMEOUT)?.is_some(),
            None => false,
        };

        if has_timeout {
            let status = Status::internal("grpc-timeout in a trailer block is a protocol violation");
            *self.cancelled.lock().await = Some(status.clone());
            return Err(status.into());
        }

        Ok(())
    }

    /// Registers an outbound client call as a child of this request
    /// (§4.3 "Child calls"): if this request is cancelled or errors, the
    /// child is cancelled with the matching code. If the request is
    /// already closed, the child is cancelled immediately.
    pub async fn add_child(&self, child: impl Cancellable + 'static) {
        if let Some(status) = self.cancelled.lock().await.clone() {
            child.cancel(status);
            return;
        }

        self.children.lock().await.push(Box::new(child));
    }
}

/// Shared, mutable response bookkeeping: headers staged before the first
/// write, user trailers, and the terminal `(rpcCode, rpcMessage)` pair.
pub(crate) struct ResponseState {
    pub(crate) headers_sent: bool,
    pub(crate) headers: Metadata,
    pub(crate) trailers: Metadata,
    pub(crate) rpc_code: RpcCode,
    pub(crate) rpc_message: String,
}

impl ResponseState {
    pub(crate) fn new() -> Self {
        Self {
            headers_sent: false,
            headers: Metadata::new(),
            trailers: Metadata::new(),
            rpc_code: RpcCode::Ok,
            rpc_message: String::new(),
        }
    }
}

/// The outbound half of an accepted call (§4.3 "response").
pub struct ServerStreamingResponse<Res> {
    marshal: Option<crate::service::MarshalFn<Res>>,
    message_sender: channel::Sender<Bytes>,
    state: Arc<Mutex<ResponseState>>,
    headers_ready: Arc<Eventually<Metadata>>,
}

impl<Res> ServerStreamingResponse<Res> {
    pub(crate) fn new(
        marshal: Option<crate::service::MarshalFn<Res>>,
        message_sender: channel::Sender<Bytes>,
        state: Arc<Mutex<ResponseState>>,
        headers_ready: Arc<Eventually<Metadata>>,
    ) -> Self {
        Self {
            marshal,
            message_sender,
            state,
            headers_ready,
        }
    }

    /// Sets a header to be emitted in the initial header block. Per §4.3
    /// this must happen before the first `send()`, since `serve_call` hands
    /// the response head to the transport as soon as headers are committed
    /// (on the first `send()`, or once the handler returns having never
    /// sent anything) rather than waiting for the whole call to finish.
    pub async fn set_header(&self, name: impl Into<String>, value: impl Into<MetadataValue>) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.headers_sent {
            return Err(err_msg("Cannot set headers after the response has started"));
        }
        state.headers.add(name.into(), value.into());
        Ok(())
    }

    /// Commits the staged headers exactly once, unblocking `serve_call`'s
    /// immediate `Response` return. A no-op if already committed (by an
    /// earlier `send()`, or by `serve_call` once the handler has returned).
    async fn commit_headers(&self) {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.headers_sent {
                return;
            }
            state.headers_sent = true;
            state.headers.clone()
        };
        let _ = self.headers_ready.set(snapshot).await;
    }

    /// Marshals and frames a single outbound message (§4.1 framing).
    pub async fn send(&self, message: &Res) -> Result<()> {
        self.commit_headers().await;
        let payload = crate::service::marshal_or_raw(&self.marshal, message)?;
        let frame = crate::message::encode_message(&payload);
        self.message_sender
            .send(Bytes::from(frame))
            .await
            .map_err(|_| err_msg("Response stream was already closed"))
    }

    /// Stages trailers to be emitted (merged with `grpc-status`/
    /// `grpc-message`) when the call ends (§4.3 "Trailer emission").
    pub async fn add_trailers(&self, trailers: Metadata) {
        let mut state = self.state.lock().await;
        for (name, value) in trailers.iter() {
            state.trailers.add(name.clone(), value.clone());
        }
    }

    pub async fn set_status(&self, code: RpcCode, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.rpc_code = code;
        state.rpc_message = message.into();
    }

    pub async fn rpc_code(&self) -> RpcCode {
        self.state.lock().await.rpc_code
    }
}
