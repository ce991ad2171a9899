//! Client call engine (§4.2) and connection pool (§4.7).
//!
//! The pool is a thin keyed cache in front of an injected `Connector`
//! rather than a second HTTP/2 client implementation: the concrete
//! TCP/TLS/ALPN negotiation is out of scope here (`spec.md` §1), and this
//! workspace's `http` crate does not currently expose a concrete
//! `http::client::Client` from its public surface (see `DESIGN.md`), so
//! callers supply their own `(plain, host, port) -> ClientInterface`
//! factory instead.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use common::async_std::channel;
use common::async_std::sync::Mutex;
use common::errors::*;
use common::eventually::Eventually;

use http::body::Body;
use http::client_interface::ClientInterface;
use http::header::{Header, Headers};
use http::message::HTTP_V2_0;
use http::method::Method;
use http::request::{Request, RequestHead};
use http::uri::{Authority, Host, Uri};

use crate::client_types::{ClientStreamingRequest, ClientStreamingResponse, ResponseState};
use crate::constants::{CONTENT_TYPE, DEFAULT_HOST, DEFAULT_HTTPS_PORT, GRPC_CONTENT_TYPE, GRPC_MESSAGE, GRPC_STATUS, GRPC_TIMEOUT};
use crate::duration::{interval_to_micros, is_valid_interval, micros_to_interval};
use crate::message::{encode_message, MessageReader};
use crate::metadata::{decode_metadata, encode_metadata, find_reserved_header, Metadata};
use crate::service::{marshal_or_raw, unmarshal_or_raw, MarshalFn, UnmarshalFn};
use crate::status::{block_secure_header, is_known_secure_header, RpcCode, Status};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether a channel talks plain HTTP/2 or negotiates TLS first (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

/// A callback invoked at most once per call with the target authority and
/// the metadata about to be sent, returning the (possibly mutated)
/// metadata. A credential-retrieval library would plug in here (§4.2 step
/// 3, §9 "Credential hook").
pub type UpdateHeadersFn =
    Arc<dyn Fn(String, Metadata) -> BoxFuture<'static, Result<Metadata>> + Send + Sync>;

/// Per-channel configuration: everything a call to this destination shares
/// (§4.2 `protocol`, `host`, `port`, `agent`).
#[derive(Clone)]
pub struct ChannelOptions {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub update_headers: Option<UpdateHeadersFn>,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            protocol: Protocol::Https,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_HTTPS_PORT,
            update_headers: None,
        }
    }
}

/// Per-call configuration (§4.2 `options`).
///
/// `parent` linkage (attaching this call as a child of an in-flight
/// server-side request so the server's cancellation propagates here) is
/// not a field of this struct: it composes naturally with the primitives
/// already in `client_types`/`server_types` — call `request.add_child(response.handle())`
/// on the returned `ClientStreamingResponse` once this function returns
/// it, rather than threading an extra generic parameter through `call`.
pub struct CallOptions<Req, Res> {
    pub path: String,
    pub headers: Metadata,
    pub deadline: Option<Instant>,
    pub grpc_timeout: Option<String>,
    /// `None` means the §3 raw-bytes passthrough: `Req` must be `Vec<u8>`.
    pub marshal: Option<MarshalFn<Req>>,
    /// `None` means the §3 raw-bytes passthrough: `Res` must be `Vec<u8>`.
    pub unmarshal: Option<UnmarshalFn<Res>>,
}

/// The single generic streaming primitive every RPC shape is built on top
/// of (§6 "Client call engine"). Starts a background task immediately and
/// returns a handle to it; the call continues running even if the
/// returned `ClientStreamingResponse` is dropped (use `.cancel()` to stop
/// it early).
pub struct Channel {
    options: ChannelOptions,
    pool: Arc<Pool>,
}

impl Channel {
    pub fn new(options: ChannelOptions, pool: Arc<Pool>) -> Self {
        Self { options, pool }
    }

    /// Starts a call. `call_options.path` must be non-empty — an empty
    /// path is a programmer error (§4.2 step 1), not a dispatchable failure,
    /// so it panics here rather than surfacing as a cancelled call.
    pub fn call<Req, Res>(
        &self,
        call_options: CallOptions<Req, Res>,
        outbound: ClientStreamingRequest<Req>,
    ) -> ClientStreamingResponse<Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        assert!(
            !call_options.path.is_empty(),
            "rpc::Channel::call: CallOptions.path must not be empty"
        );

        let (cancel_sender, cancel_receiver) = channel::unbounded::<Status>();
        let (message_sender, message_receiver) = channel::unbounded::<Res>();

        let shared = Arc::new(ResponseState {
            message_receiver: Mutex::new(message_receiver),
            metadata: Eventually::new(),
            trailing_metadata: Eventually::new(),
            status: Eventually::new(),
            cancel_sender: cancel_sender.clone(),
        });

        let channel_options = self.options.clone();
        let pool = self.pool.clone();
        let shared_for_task = shared.clone();

        common::async_std::task::spawn(async move {
            run_call(
                channel_options,
                pool,
                call_options,
                outbound,
                cancel_receiver,
                message_sender,
                shared_for_task,
            )
            .await;
        });

        ClientStreamingResponse { shared }
    }

    /// A call that sends and receives exactly one message.
    pub async fn call_unary<Req, Res>(
        &self,
        path: impl Into<String>,
        request: Req,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> (Option<Res>, Status)
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        let response = self.call(
            CallOptions {
                path: path.into(),
                headers: Metadata::new(),
                deadline: None,
                grpc_timeout: None,
                marshal: Some(marshal),
                unmarshal: Some(unmarshal),
            },
            ClientStreamingRequest::unary(request),
        );

        let message = response.recv().await;
        let status = response.status().await.clone();
        (message, status)
    }

    /// A call that sends many messages and receives exactly one.
    pub async fn call_client_streaming<Req, Res>(
        &self,
        path: impl Into<String>,
        outbound: ClientStreamingRequest<Req>,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> (Option<Res>, Status)
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        let response = self.call(
            CallOptions {
                path: path.into(),
                headers: Metadata::new(),
                deadline: None,
                grpc_timeout: None,
                marshal: Some(marshal),
                unmarshal: Some(unmarshal),
            },
            outbound,
        );

        let message = response.recv().await;
        let status = response.status().await.clone();
        (message, status)
    }

    /// A call that sends exactly one message and receives a stream.
    pub fn call_server_streaming<Req, Res>(
        &self,
        path: impl Into<String>,
        request: Req,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> ClientStreamingResponse<Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.call(
            CallOptions {
                path: path.into(),
                headers: Metadata::new(),
                deadline: None,
                grpc_timeout: None,
                marshal: Some(marshal),
                unmarshal: Some(unmarshal),
            },
            ClientStreamingRequest::unary(request),
        )
    }

    /// A call that sends and receives a stream of messages.
    pub fn call_bidi_streaming<Req, Res>(
        &self,
        path: impl Into<String>,
        outbound: ClientStreamingRequest<Req>,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> ClientStreamingResponse<Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.call(
            CallOptions {
                path: path.into(),
                headers: Metadata::new(),
                deadline: None,
                grpc_timeout: None,
                marshal: Some(marshal),
                unmarshal: Some(unmarshal),
            },
            outbound,
        )
    }
}

async fn run_call<Req, Res>(
    channel_options: ChannelOptions,
    pool: Arc<Pool>,
    call_options: CallOptions<Req, Res>,
    outbound: ClientStreamingRequest<Req>,
    cancel_receiver: channel::Receiver<Status>,
    message_sender: channel::Sender<Res>,
    shared: Arc<ResponseState<Res>>,
) where
    Req: Send + 'static,
    Res: Send + 'static,
{
    // The local timer must race whichever of `deadline`/`grpc_timeout` the
    // caller set (§4.2 step 5 derives the wire `grpc-timeout` from
    // `deadline` when only the latter is given; this is that derivation's
    // mirror image, deriving a local `Instant` from `grpc_timeout` when only
    // it is given, so a caller who sets `grpc_timeout` directly still gets
    // a client-side `DEADLINE_EXCEEDED`).
    let deadline = call_options.deadline.or_else(|| {
        call_options
            .grpc_timeout
            .as_deref()
            .and_then(|raw| interval_to_micros(raw).ok())
            .map(|micros| Instant::now() + std::time::Duration::from_micros(micros))
    });

    let body = async {
        run_call_body(
            channel_options,
            pool,
            call_options,
            outbound,
            message_sender,
            shared.clone(),
        )
        .await
    };

    let watch_cancel = async {
        cancel_receiver
            .recv()
            .await
            .unwrap_or_else(|_| Status::cancelled("Call dropped"))
    };

    let outcome = common::future::race(
        async { Outcome::Finished(body.await) },
        async { Outcome::Cancelled(watch_cancel.await) },
    );

    let outcome = match deadline {
        Some(at) => {
            let remaining = at.saturating_duration_since(Instant::now());
            match common::async_std::future::timeout(remaining, outcome).await {
                Ok(outcome) => outcome,
                Err(_) => Outcome::Cancelled(Status::deadline_exceeded("Deadline exceeded")),
            }
        }
        None => outcome.await,
    };

    let status = match outcome {
        Outcome::Finished(status) => status,
        Outcome::Cancelled(status) => status,
    };

    let _ = shared.status.set(status).await;
}

enum Outcome {
    Finished(Status),
    Cancelled(Status),
}

async fn run_call_body<Req, Res>(
    channel_options: ChannelOptions,
    pool: Arc<Pool>,
    call_options: CallOptions<Req, Res>,
    outbound: ClientStreamingRequest<Req>,
    message_sender: channel::Sender<Res>,
    shared: Arc<ResponseState<Res>>,
) -> Status
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    let authority = format!("{}:{}", channel_options.host, channel_options.port);

    let mut headers = call_options.headers;
    if let Some(update_headers) = &channel_options.update_headers {
        headers = match update_headers(authority.clone(), headers).await {
            Ok(h) => h,
            Err(e) => return Status::unauthenticated(e.to_string()),
        };
    }

    let grpc_timeout = match &call_options.grpc_timeout {
        Some(raw) => {
            if !is_valid_interval(raw) {
                return Status::internal(format!("Invalid grpc-timeout value: {}", raw));
            }
            Some(raw.clone())
        }
        None => match call_options.deadline {
            Some(at) => {
                let micros = at.saturating_duration_since(Instant::now()).as_micros() as u64;
                match micros_to_interval(micros) {
                    Ok(v) => Some(v),
                    Err(e) => return Status::internal(e.to_string()),
                }
            }
            None => None,
        },
    };

    let mut wire_headers = match encode_metadata(&headers) {
        Ok(h) => h,
        Err(e) => return Status::internal(format!("Failed to encode headers: {}", e)),
    };

    wire_headers
        .push(Header::new(CONTENT_TYPE, GRPC_CONTENT_TYPE).unwrap());

    if let Some(timeout) = grpc_timeout {
        wire_headers.push(Header::new(GRPC_TIMEOUT, timeout).unwrap());
    }

    let plain = channel_options.protocol == Protocol::Http;
    if plain {
        for header in &wire_headers.raw_headers {
            let name = header.name.as_str();
            if is_known_secure_header(name) {
                match block_secure_header(name, false) {
                    Ok(true) => return Status::unauthenticated(format!(
                        "Secure header '{}' rejected on an insecure channel",
                        name
                    )),
                    Ok(false) => {}
                    Err(e) => return Status::internal(e.to_string()),
                }
            }
        }
    }

    let uri = Uri {
        scheme: None,
        authority: Some(Authority {
            user: None,
            host: Host::Name(parsing::ascii::AsciiString::from(channel_options.host.clone()).unwrap()),
            port: Some(channel_options.port as usize),
        }),
        path: call_options.path.clone(),
        query: None,
        fragment: None,
    };

    let request_body = OutboundBody {
        outbound: Mutex::new(outbound),
        marshal: call_options.marshal,
        pending: Vec::new(),
        done: false,
    };

    let request = Request {
        head: RequestHead {
            method: Method::POST,
            uri,
            version: HTTP_V2_0,
            headers: wire_headers,
        },
        body: Box::new(request_body),
    };

    let client = match pool
        .get(PoolKey {
            plain,
            host: channel_options.host.clone(),
            port: channel_options.port,
        })
        .await
    {
        Ok(client) => client,
        Err(e) => return Status::unavailable(e.to_string()),
    };

    let mut response = match client.request(request).await {
        Ok(r) => r,
        Err(e) => return Status::unavailable(e.to_string()),
    };

    if let Some(code_str) = match find_reserved_header(&response.head.headers, GRPC_STATUS) {
        Ok(v) => v,
        Err(e) => return Status::internal(e.to_string()),
    } {
        // Trailers-Only response (§4.2 "Receiving"): the single header block
        // plays both roles, so it is decoded into both `metadata` and
        // `trailing_metadata` rather than leaving either getter unresolved.
        if let Ok(metadata) = decode_metadata(&response.head.headers) {
            let _ = shared.metadata.set(metadata.clone()).await;
            let _ = shared.trailing_metadata.set(metadata).await;
        }
        return trailers_only_status(code_str, &response.head.headers);
    }

    match decode_metadata(&response.head.headers) {
        Ok(metadata) => {
            let _ = shared.metadata.set(metadata).await;
        }
        Err(e) => return Status::internal(format!("Malformed response metadata: {}", e)),
    }

    let mut reader = MessageReader::new(response.body);
    loop {
        let message = match reader.read_message().await {
            Ok(Some(m)) => m,
            Ok(None) => break,
            Err(e) => return Status::internal(format!("Failed to decode response frame: {}", e)),
        };

        let value = match unmarshal_or_raw(&call_options.unmarshal, &message.payload) {
            Ok(v) => v,
            Err(e) => return Status::internal(format!("Failed to unmarshal response: {}", e)),
        };

        if message_sender.send(value).await.is_err() {
            break;
        }
    }

    let body = reader.into_inner();
    let trailers = body_trailers(body).await;

    match trailers {
        Ok(Some(trailers)) => {
            match decode_metadata(&trailers) {
                Ok(trailing) => {
                    let _ = shared.trailing_metadata.set(trailing).await;
                }
                Err(e) => return Status::internal(format!("Malformed response trailers: {}", e)),
            }

            match find_reserved_header(&trailers, GRPC_STATUS) {
                Ok(Some(code_str)) => trailers_only_status(code_str, &trailers),
                Ok(None) => Status::internal("Missing terminal status in response trailers"),
                Err(e) => Status::internal(e.to_string()),
            }
        }
        Ok(None) => Status::internal("Missing terminal status in response trailers"),
        Err(e) => Status::internal(e.to_string()),
    }
}

async fn body_trailers(mut body: Box<dyn Body>) -> Result<Option<Headers>> {
    body.trailers().await
}

fn trailers_only_status(code_str: &str, headers: &Headers) -> Status {
    let code = match code_str.parse::<u32>().ok().and_then(RpcCode::from_u32) {
        Some(c) => c,
        None => return Status::internal(format!("Malformed grpc-status value: {}", code_str)),
    };

    let message = find_reserved_header(headers, GRPC_MESSAGE)
        .ok()
        .flatten()
        .unwrap_or("")
        .to_string();

    Status::new(code, message)
}

/// Streams outbound application messages into DATA frames, marshalling
/// each one lazily as it is pulled (§4.1 "Start" step 7).
///
/// `outbound` is wrapped in a `Mutex` purely so this type is `Sync` (`Body`
/// requires it): `ClientStreamingRequest`'s inner `Box<dyn Streamable>` is
/// only `Send`, and `read()` never actually contends on the lock since it
/// already takes `&mut self`.
struct OutboundBody<Req> {
    outbound: Mutex<ClientStreamingRequest<Req>>,
    marshal: Option<MarshalFn<Req>>,
    pending: Vec<u8>,
    done: bool,
}

#[async_trait]
impl<Req: Send + 'static> http::body::Body for OutboundBody<Req> {
    fn len(&self) -> Option<usize> {
        None
    }

    async fn trailers(&mut self) -> Result<Option<Headers>> {
        Ok(None)
    }
}

#[async_trait]
impl<Req: Send + 'static> common::io::Readable for OutboundBody<Req> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            if !self.pending.is_empty() {
                let n = std::cmp::min(buf.len(), self.pending.len());
                buf[..n].copy_from_slice(&self.pending[..n]);
                self.pending.drain(..n);
                return Ok(n);
            }

            if self.done {
                return Ok(0);
            }

            match self.outbound.lock().await.next().await {
                Some(message) => {
                    let payload = marshal_or_raw(&self.marshal, &message)?;
                    self.pending = encode_message(&payload);
                }
                None => {
                    self.done = true;
                }
            }
        }
    }
}

/// `(plain?, host, port)` key from §4.7.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    plain: bool,
    host: String,
    port: u16,
}

type ConnectResult = std::result::Result<Arc<dyn ClientInterface + Send + Sync>, String>;

/// Factory that establishes (or reuses) the transport for a pool key.
/// Negotiating the actual TCP/TLS/ALPN handshake and multiplexing streams
/// over it is the concern of whatever `http` client implementation this
/// is constructed with; the pool only de-duplicates concurrent connects
/// to the same key (§4.7 "single-shot notifier").
pub type Connector =
    Arc<dyn Fn(bool, String, u16) -> BoxFuture<'static, Result<Arc<dyn ClientInterface + Send + Sync>>> + Send + Sync>;

pub struct Pool {
    connector: Connector,
    entries: Mutex<HashMap<PoolKey, Arc<Eventually<ConnectResult>>>>,
}

impl Pool {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn get(&self, key: PoolKey) -> Result<Arc<dyn ClientInterface + Send + Sync>> {
        let (slot, is_owner) = {
            let mut entries = self.entries.lock().await;
            if let Some(slot) = entries.get(&key) {
                (slot.clone(), false)
            } else {
                let slot = Arc::new(Eventually::new());
                entries.insert(key.clone(), slot.clone());
                (slot, true)
            }
        };

        if is_owner {
            let result = (self.connector)(key.plain, key.host.clone(), key.port).await;
            let stored: ConnectResult = match &result {
                Ok(client) => Ok(client.clone()),
                Err(e) => Err(e.to_string()),
            };

            let failed = stored.is_err();
            let _ = slot.set(stored).await;

            if failed {
                self.entries.lock().await.remove(&key);
            }
        }

        match slot.get().await {
            Ok(client) => Ok(client.clone()),
            Err(message) => Err(format_err!("{}", message)),
        }
    }
}
