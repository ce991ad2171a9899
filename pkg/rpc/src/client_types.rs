//! Per-call stream types shared by all four RPC shapes (unary,
//! client-streaming, server-streaming, bidi) on the client side (§4.2).

use std::sync::Arc;

use common::async_std::channel;
use common::async_std::sync::Mutex;
use common::eventually::Eventually;
use common::io::{SingleItemStreamable, Streamable};

use crate::metadata::Metadata;
use crate::status::Status;

/// Something that can be told to stop with a terminal status. Used to link
/// a server-side request to the outbound "child" client calls it opened
/// (§4.2 "Parent linkage", §4.3 "Child calls").
pub trait Cancellable: Send + Sync {
    fn cancel(&self, status: Status);
}

/// The lazy, finite, not-restartable sequence of outbound application
/// messages a caller supplies to `Channel::call` (§4.2 `outbound`).
pub struct ClientStreamingRequest<Req> {
    inner: Box<dyn Streamable<Item = Req>>,
}

impl<Req: 'static + Send> ClientStreamingRequest<Req> {
    pub fn new<S: Streamable<Item = Req> + 'static>(stream: S) -> Self {
        Self {
            inner: Box::new(stream),
        }
    }

    /// The common case: a call that sends exactly one request message.
    pub fn unary(value: Req) -> Self {
        Self::new(SingleItemStreamable::new(value))
    }

    pub async fn next(&mut self) -> Option<Req> {
        self.inner.next().await
    }
}

/// A handle that can cancel the call behind a `ClientStreamingResponse`
/// without needing to hold the response itself (used for parent/child
/// linkage, where the request object outlives any individual response
/// borrow).
#[derive(Clone)]
pub struct CallHandle {
    cancel_sender: channel::Sender<Status>,
}

impl Cancellable for CallHandle {
    fn cancel(&self, status: Status) {
        let _ = self.cancel_sender.try_send(status);
    }
}

/// Shared state written by the call engine's background task and read by
/// the user-facing `ClientStreamingResponse`.
pub(crate) struct ResponseState<Res> {
    pub(crate) message_receiver: Mutex<channel::Receiver<Res>>,
    pub(crate) metadata: Eventually<Metadata>,
    pub(crate) trailing_metadata: Eventually<Metadata>,
    pub(crate) status: Eventually<Status>,
    pub(crate) cancel_sender: channel::Sender<Status>,
}

/// The inbound half of a call (§4.2 "Receiving", §5 "Ordering guarantees"):
/// at most one `metadata`, zero-or-more messages in arrival order, then
/// exactly one terminal `status`.
pub struct ClientStreamingResponse<Res> {
    pub(crate) shared: Arc<ResponseState<Res>>,
}

impl<Res> ClientStreamingResponse<Res> {
    /// Receives the next inbound message, or `None` once the stream has
    /// ended (the terminal status is then available via `status()`).
    pub async fn recv(&self) -> Option<Res> {
        self.shared.message_receiver.lock().await.recv().await.ok()
    }

    /// Blocks until the response metadata (initial non-reserved headers)
    /// is available. Resolves before the first `recv()` yields data.
    pub async fn metadata(&self) -> &Metadata {
        self.shared.metadata.get().await
    }

    /// Blocks until the call has reached its terminal status.
    pub async fn status(&self) -> &Status {
        self.shared.status.get().await
    }

    /// Blocks until the terminal trailer block has been decoded (after the
    /// last message, alongside the terminal status): the non-reserved
    /// metadata a server attached via `add_trailers` rather than its
    /// initial header block.
    pub async fn trailing_metadata(&self) -> &Metadata {
        self.shared.trailing_metadata.get().await
    }

    /// User-initiated cancellation (§4.2 "Cancellation"): resets the
    /// stream and causes the terminal status to be `CANCELLED` (unless one
    /// was already produced). Idempotent; a no-op on an already-closed
    /// call.
    pub fn cancel(&self) {
        let _ = self
            .shared
            .cancel_sender
            .try_send(Status::cancelled("Call cancelled by caller"));
    }

    pub fn handle(&self) -> CallHandle {
        CallHandle {
            cancel_sender: self.shared.cancel_sender.clone(),
        }
    }
}

impl<Res> Cancellable for ClientStreamingResponse<Res> {
    fn cancel(&self, status: Status) {
        let _ = self.shared.cancel_sender.try_send(status);
    }
}
