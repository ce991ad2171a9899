//! Service descriptors (§3 "Service descriptor", §4.5 "Service descriptor
//! generator").
//!
//! The original generator consumes a parsed `.proto` file; `protobuf` isn't
//! part of this workspace (see `DESIGN.md`), so the input here is an
//! already-parsed, in-memory `ServiceSchema` instead. Everything downstream
//! of that input — the descriptor shape, the route naming, the
//! marshal/unmarshal wiring — is unchanged.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use common::errors::*;

use crate::channel::Channel;
use crate::client_types::{ClientStreamingRequest, ClientStreamingResponse};
use crate::server::serve_call;
use crate::server_types::{ServerStreamingRequest, ServerStreamingResponse};
use crate::status::Status;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Converts an application value to its wire payload. Opaque to the core:
/// `rpc` never inspects `T` beyond the `Send + 'static` bound it needs to
/// move the value between tasks.
pub type MarshalFn<T> = Arc<dyn Fn(&T) -> Result<Vec<u8>> + Send + Sync>;

/// Converts a wire payload back into an application value.
pub type UnmarshalFn<T> = Arc<dyn Fn(&[u8]) -> Result<T> + Send + Sync>;

/// Marshals `message` with `marshal` if one is configured, otherwise passes
/// it through as raw bytes (§3 "Marshal and unmarshal may be absent; if so,
/// the engine passes raw bytes"). The raw path only succeeds when `Req` is
/// actually `Vec<u8>`; configuring no marshaller for any other message type
/// is a programmer error, reported as `INTERNAL` rather than panicking.
pub fn marshal_or_raw<Req: Send + 'static>(
    marshal: &Option<MarshalFn<Req>>,
    message: &Req,
) -> Result<Vec<u8>> {
    match marshal {
        Some(f) => f(message),
        None => (message as &dyn std::any::Any)
            .downcast_ref::<Vec<u8>>()
            .cloned()
            .ok_or_else(|| err_msg("No marshaller configured and message is not raw bytes")),
    }
}

/// The receiving half of `marshal_or_raw`: unmarshals with `unmarshal` if
/// configured, otherwise requires `Res` to be `Vec<u8>` and hands the raw
/// payload back directly.
pub fn unmarshal_or_raw<Res: Send + 'static>(
    unmarshal: &Option<UnmarshalFn<Res>>,
    bytes: &[u8],
) -> Result<Res> {
    match unmarshal {
        Some(f) => f(bytes),
        None => {
            let boxed: Box<dyn std::any::Any> = Box::new(bytes.to_vec());
            boxed
                .downcast::<Res>()
                .map(|b| *b)
                .map_err(|_| err_msg("No unmarshaller configured and message is not raw bytes"))
        }
    }
}

/// Type-erased entry in a server's route table: already closed over its
/// method's concrete `Req`/`Res` types and their marshal/unmarshal
/// callables. Built by `unary_method`/`client_streaming_method`/etc., never
/// constructed directly by application code.
pub type RouteHandler =
    Arc<dyn Fn(http::Request, bool) -> BoxFuture<'static, http::Response> + Send + Sync>;

/// One RPC method's static shape, independent of any particular descriptor
/// polarity (client vs. server).
#[derive(Debug, Clone)]
pub struct MethodSchema {
    pub name: &'static str,
    pub request_streaming: bool,
    pub response_streaming: bool,
}

/// A service's static shape: the "structured schema" §4.5 takes as input,
/// in place of a parsed `.proto` file.
#[derive(Debug, Clone)]
pub struct ServiceSchema {
    pub name: &'static str,
    pub methods: Vec<MethodSchema>,
}

/// One method as it appears in a `ServiceDescriptor`.
///
/// §3 describes a `Method` as `{name, marshal, unmarshal, requestStream?,
/// responseStream?}`; this struct only carries the name and streaming
/// flags needed to compute the required route set; the marshal/unmarshal
/// callables are per-call, not per-descriptor, values — they are supplied
/// directly to `method_handler`/`CallOptions` (as `Option<MarshalFn<_>>`/
/// `Option<UnmarshalFn<_>>`, `None` meaning the §3 raw-bytes passthrough),
/// because they are typed over the method's concrete `Req`/`Res`, which
/// this type-erased descriptor does not carry.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub request_streaming: bool,
    pub response_streaming: bool,
}

/// `{name, methods[]}` from §3. Produced from a `ServiceSchema` by
/// `ServiceDescriptor::from_schema`; used by `RpcApp::add_service` to
/// compute the required route set and by a generated client constructor to
/// build its per-method call wrappers.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    pub fn from_schema(schema: &ServiceSchema) -> Self {
        Self {
            name: schema.name,
            methods: schema
                .methods
                .iter()
                .map(|m| MethodDescriptor {
                    name: m.name,
                    request_streaming: m.request_streaming,
                    response_streaming: m.response_streaming,
                })
                .collect(),
        }
    }

    /// The full set of routes (`/ServiceFullName/MethodName`) this service
    /// requires handlers for.
    pub fn routes(&self) -> Vec<String> {
        self.methods.iter().map(|m| route(self.name, m.name)).collect()
    }
}

/// The runtime half of §4.5's "client constructor": a client bound to one
/// service by name, so callers invoke methods by their declared name and
/// get the correct `/FullServiceName/MethodName` wire path for free rather
/// than assembling it by hand on every call. A real protobuf-generated
/// binding would wrap each of these in a named, statically-typed method;
/// without a build-time generator in this workspace (see `DESIGN.md`),
/// this is the entry point such generated code would call into.
pub struct ServiceClient<'a> {
    channel: &'a Channel,
    service_name: &'static str,
}

impl<'a> ServiceClient<'a> {
    pub fn new(channel: &'a Channel, service_name: &'static str) -> Self {
        Self {
            channel,
            service_name,
        }
    }

    fn route(&self, method_name: &str) -> String {
        route(self.service_name, method_name)
    }

    pub async fn call_unary<Req, Res>(
        &self,
        method_name: &str,
        request: Req,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> (Option<Res>, Status)
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.channel
            .call_unary(self.route(method_name), request, marshal, unmarshal)
            .await
    }

    pub async fn call_client_streaming<Req, Res>(
        &self,
        method_name: &str,
        outbound: ClientStreamingRequest<Req>,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> (Option<Res>, Status)
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.channel
            .call_client_streaming(self.route(method_name), outbound, marshal, unmarshal)
            .await
    }

    pub fn call_server_streaming<Req, Res>(
        &self,
        method_name: &str,
        request: Req,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> ClientStreamingResponse<Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.channel
            .call_server_streaming(self.route(method_name), request, marshal, unmarshal)
    }

    pub fn call_bidi_streaming<Req, Res>(
        &self,
        method_name: &str,
        outbound: ClientStreamingRequest<Req>,
        marshal: MarshalFn<Req>,
        unmarshal: UnmarshalFn<Res>,
    ) -> ClientStreamingResponse<Res>
    where
        Req: Send + 'static,
        Res: Send + 'static,
    {
        self.channel
            .call_bidi_streaming(self.route(method_name), outbound, marshal, unmarshal)
    }
}

/// Builds the wire path for a method: `/FullServiceName/MethodName`. The
/// wire path always uses the schema's original capitalisation (§4.5); any
/// lower-camel-casing is purely a generated-client-side naming convention
/// applied above this layer, not to the route string itself.
pub fn route(service_name: &str, method_name: &str) -> String {
    format!("/{}/{}", service_name, method_name)
}

/// Builds a type-erased `RouteHandler` for a method out of concrete
/// `Req`/`Res` types, their marshal/unmarshal callables (or `None` for the
/// raw-bytes passthrough from §3), and a typed handler closure. This is the
/// glue a generated `_server.rs` module would emit per method;
/// `RpcApp::add_method` takes exactly this shape.
///
/// `handler` returns `Result<()>` rather than `()`: a propagated `Err`
/// converts to `response.rpcCode = UNKNOWN` (§4.3 "Error handling", §7
/// "Application errors") unless the handler already set a more specific
/// code via `ServerStreamingResponse::set_status`.
pub fn method_handler<Req, Res, F, Fut>(
    unmarshal: Option<UnmarshalFn<Req>>,
    marshal: Option<MarshalFn<Res>>,
    handler: F,
) -> RouteHandler
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: Fn(ServerStreamingRequest<Req>, ServerStreamingResponse<Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |request, is_secure| {
        let unmarshal = unmarshal.clone();
        let marshal = marshal.clone();
        let handler = handler.clone();
        Box::pin(async move {
            serve_call(request, is_secure, unmarshal, marshal, move |req, res| {
                handler(req, res)
            })
            .await
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_uses_original_capitalisation() {
        assert_eq!(route("math.Math", "Div"), "/math.Math/Div");
    }

    #[test]
    fn descriptor_lists_every_schema_route() {
        let schema = ServiceSchema {
            name: "math.Math",
            methods: vec![
                MethodSchema {
                    name: "Div",
                    request_streaming: false,
                    response_streaming: false,
                },
                MethodSchema {
                    name: "Fib",
                    request_streaming: false,
                    response_streaming: true,
                },
            ],
        };

        let descriptor = ServiceDescriptor::from_schema(&schema);
        assert_eq!(
            descriptor.routes(),
            vec!["/math.Math/Div".to_string(), "/math.Math/Fib".to_string()]
        );
    }
}
