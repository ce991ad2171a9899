//! A gRPC-compatible RPC runtime: wire framing, client/server call engines,
//! and the route table that ties a service descriptor to handlers (see
//! `DESIGN.md`).
//!
//! Unlike a generated `_grpc.rs` module, nothing here parses a `.proto`
//! file: `service::ServiceSchema` takes the already-parsed shape directly,
//! and application code is responsible for supplying marshal/unmarshal
//! callables (ordinarily protobuf encode/decode, but this crate never
//! assumes that).

#[macro_use]
extern crate common;
#[macro_use]
extern crate regexp_macros;

pub mod app;
pub mod channel;
pub mod client_types;
pub mod constants;
pub mod duration;
pub mod message;
pub mod metadata;
pub mod server;
pub mod server_types;
pub mod service;
pub mod status;

pub use app::RpcApp;
pub use channel::{CallOptions, Channel, ChannelOptions, Connector, Pool, Protocol};
pub use client_types::{CallHandle, Cancellable, ClientStreamingRequest, ClientStreamingResponse};
pub use metadata::{Metadata, MetadataValue};
pub use server_types::{ServerStreamingRequest, ServerStreamingResponse};
pub use service::{route, method_handler, MarshalFn, MethodDescriptor, MethodSchema, RouteHandler, ServiceClient, ServiceDescriptor, ServiceSchema, UnmarshalFn};
pub use status::{RpcCode, SecureHeaderPolicy, Status};

#[cfg(test)]
mod tests {
    //! Integration-style tests exercising a full client/server round trip
    //! in-process, bypassing the network: the "connector" hands the client
    //! an in-memory `ClientInterface` that calls straight into an
    //! `RpcApp`'s route table (§8 "Testable scenarios").

    use std::convert::TryInto;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use common::errors::*;
    use http::client_interface::ClientInterface;
    use http::request::Request;
    use http::response::Response;
    use http::server_handler::{ServerConnectionContext, ServerHandler, ServerRequestContext};

    use crate::app::RpcApp;
    use crate::channel::{CallOptions, Channel, ChannelOptions, Connector, Pool};
    use crate::client_types::ClientStreamingRequest;
    use crate::metadata::{Metadata, MetadataValue};
    use crate::service::{
        method_handler, MarshalFn, MethodSchema, ServiceClient, ServiceDescriptor, ServiceSchema,
        UnmarshalFn,
    };
    use crate::status::RpcCode;

    /// Wraps a server's `RpcApp` so it can be reached as a `ClientInterface`
    /// without going through a real socket.
    struct LoopbackClient {
        app: Arc<RpcApp>,
    }

    #[async_trait]
    impl ClientInterface for LoopbackClient {
        async fn request(&self, request: Request) -> Result<Response> {
            let connection_context = ServerConnectionContext {
                id: 0,
                peer_addr: net::ip::IPAddress::V4([127, 0, 0, 1]),
                peer_port: 0,
                tls: None,
            };
            let context = ServerRequestContext {
                connection_context: &connection_context,
            };
            Ok(self.app.handle_request(request, context).await)
        }
    }

    fn loopback_connector(app: Arc<RpcApp>) -> Connector {
        Arc::new(move |_plain, _host, _port| {
            let app = app.clone();
            Box::pin(async move {
                let client: Arc<dyn ClientInterface + Send + Sync> = Arc::new(LoopbackClient { app });
                Ok(client)
            })
        })
    }

    fn channel_for(app: RpcApp) -> Channel {
        let app = Arc::new(app);
        let pool = Arc::new(Pool::new(loopback_connector(app)));
        Channel::new(ChannelOptions::default(), pool)
    }

    fn string_marshal() -> MarshalFn<String> {
        Arc::new(|v: &String| Ok(v.clone().into_bytes()))
    }

    fn string_unmarshal() -> UnmarshalFn<String> {
        Arc::new(|b: &[u8]| {
            String::from_utf8(b.to_vec()).map_err(|e| format_err!("Invalid UTF-8: {}", e))
        })
    }

    fn i32_marshal() -> MarshalFn<i32> {
        Arc::new(|v: &i32| Ok(v.to_be_bytes().to_vec()))
    }

    fn i32_unmarshal() -> UnmarshalFn<i32> {
        Arc::new(|b: &[u8]| {
            let arr: [u8; 4] = b
                .try_into()
                .map_err(|_| err_msg("Expected a 4 byte payload"))?;
            Ok(i32::from_be_bytes(arr))
        })
    }

    /// §8 S1: Echo unary call returns the same payload sent.
    #[test]
    fn echo_unary_round_trips() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "test.Echo",
                methods: vec![MethodSchema {
                    name: "Say",
                    request_streaming: false,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/test.Echo/Say",
                method_handler(
                    Some(string_unmarshal()),
                    Some(string_marshal()),
                    |req, res| async move {
                        let message = req.recv().await?.unwrap();
                        res.send(&message).await?;
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);
            let (value, status) = channel
                .call_unary::<String, String>(
                    "/test.Echo/Say",
                    "hello".to_string(),
                    string_marshal(),
                    string_unmarshal(),
                )
                .await;

            assert!(status.is_ok());
            assert_eq!(value, Some("hello".to_string()));
        });
    }

    /// §8 S2: An application error maps to a non-OK status with no message
    /// payload delivered.
    #[test]
    fn divide_by_zero_returns_invalid_argument() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "math.Math",
                methods: vec![MethodSchema {
                    name: "Div",
                    request_streaming: false,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/math.Math/Div",
                method_handler(
                    Some(i32_unmarshal()),
                    Some(i32_marshal()),
                    |req, res| async move {
                        let divisor = req.recv().await?.unwrap();
                        if divisor == 0 {
                            res.set_status(RpcCode::InvalidArgument, "Division by zero").await;
                            return Ok(());
                        }
                        res.send(&(100 / divisor)).await?;
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);
            let (value, status) = channel
                .call_unary::<i32, i32>("/math.Math/Div", 0, i32_marshal(), i32_unmarshal())
                .await;

            assert_eq!(value, None);
            assert_eq!(status.code, RpcCode::InvalidArgument);
        });
    }

    /// §8 S3: A client-streaming call whose handler sums every inbound
    /// message before responding once.
    #[test]
    fn streaming_request_is_consumed_in_order() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "test.Sum",
                methods: vec![MethodSchema {
                    name: "Accumulate",
                    request_streaming: true,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/test.Sum/Accumulate",
                method_handler(
                    Some(i32_unmarshal()),
                    Some(i32_marshal()),
                    |req, res| async move {
                        let mut total = 0;
                        while let Some(value) = req.recv().await? {
                            total += value;
                        }
                        res.send(&total).await?;
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);

            struct VecStreamable {
                values: Vec<i32>,
            }

            #[async_trait]
            impl common::io::Streamable for VecStreamable {
                type Item = i32;
                async fn next(&mut self) -> Option<i32> {
                    if self.values.is_empty() {
                        None
                    } else {
                        Some(self.values.remove(0))
                    }
                }
            }

            let outbound = ClientStreamingRequest::new(VecStreamable {
                values: vec![1, 2, 3, 4],
            });

            let (value, status) = channel
                .call_client_streaming::<i32, i32>(
                    "/test.Sum/Accumulate",
                    outbound,
                    i32_marshal(),
                    i32_unmarshal(),
                )
                .await;

            assert!(status.is_ok());
            assert_eq!(value, Some(10));
        });
    }

    /// §8 S6: Non-ASCII metadata round-trips through the binary header
    /// transform both on the way in and the way back out.
    #[test]
    fn binary_metadata_round_trips_through_bin_suffix() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "test.Echo",
                methods: vec![MethodSchema {
                    name: "SayWithTrace",
                    request_streaming: false,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/test.Echo/SayWithTrace",
                method_handler(
                    Some(string_unmarshal()),
                    Some(string_marshal()),
                    |req, res| async move {
                        let incoming_trace = req.metadata().get("trace");
                        assert_eq!(incoming_trace, vec![&MetadataValue::Binary(vec![1, 2, 3])]);

                        let mut trailers = Metadata::new();
                        trailers.add("trace-out", MetadataValue::Binary(vec![4, 5, 6]));
                        res.add_trailers(trailers).await;

                        let message = req.recv().await?.unwrap();
                        res.send(&message).await?;
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);

            let mut headers = Metadata::new();
            headers.add("trace", MetadataValue::Binary(vec![1, 2, 3]));

            let response = channel.call(
                CallOptions {
                    path: "/test.Echo/SayWithTrace".to_string(),
                    headers,
                    deadline: Some(Instant::now() + Duration::from_secs(5)),
                    grpc_timeout: None,
                    marshal: Some(string_marshal()),
                    unmarshal: Some(string_unmarshal()),
                },
                ClientStreamingRequest::unary("hi".to_string()),
            );

            let value = response.recv().await;
            let status = response.status().await.clone();
            let trailing = response.trailing_metadata().await;

            assert!(status.is_ok());
            assert_eq!(value, Some("hi".to_string()));
            assert_eq!(
                trailing.get("trace-out"),
                vec![&MetadataValue::Binary(vec![4, 5, 6])]
            );
        });
    }

    /// §4.5: a `ServiceClient` resolves a method name against the service
    /// it's bound to instead of the caller assembling `/Service/Method`.
    #[test]
    fn service_client_resolves_routes_by_method_name() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "test.Echo",
                methods: vec![MethodSchema {
                    name: "Say",
                    request_streaming: false,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/test.Echo/Say",
                method_handler(
                    Some(string_unmarshal()),
                    Some(string_marshal()),
                    |req, res| async move {
                        let message = req.recv().await?.unwrap();
                        res.send(&message).await?;
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);
            let client = ServiceClient::new(&channel, "test.Echo");
            let (value, status) = client
                .call_unary::<String, String>(
                    "Say",
                    "hello".to_string(),
                    string_marshal(),
                    string_unmarshal(),
                )
                .await;

            assert!(status.is_ok());
            assert_eq!(value, Some("hello".to_string()));
        });
    }

    /// §8 S4: A server-streaming call delivers every message the handler
    /// sends, in order, before the terminal `OK` status.
    #[test]
    fn server_streaming_delivers_every_message_in_order() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "math.Math",
                methods: vec![MethodSchema {
                    name: "Fib",
                    request_streaming: false,
                    response_streaming: true,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/math.Math/Fib",
                method_handler(
                    Some(i32_unmarshal()),
                    Some(i32_marshal()),
                    |req, res| async move {
                        let count = req.recv().await?.unwrap();
                        let (mut a, mut b) = (0, 1);
                        for _ in 0..count {
                            res.send(&a).await?;
                            let next = a + b;
                            a = b;
                            b = next;
                        }
                        Ok(())
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);
            let response =
                channel.call_server_streaming::<i32, i32>("/math.Math/Fib", 6, i32_marshal(), i32_unmarshal());

            let mut values = Vec::new();
            while let Some(value) = response.recv().await {
                values.push(value);
            }

            assert!(response.status().await.is_ok());
            assert_eq!(values, vec![0, 1, 1, 2, 3, 5]);
        });
    }

    /// §8 S5: A deadline exceeded on the server cancels the handler and
    /// propagates a matching cancellation to any child calls it registered
    /// via `request.add_child`; the client observes `DEADLINE_EXCEEDED`.
    #[test]
    fn deadline_exceeded_cancels_handler_and_propagates_to_children() {
        common::async_std::task::block_on(async {
            let schema = ServiceSchema {
                name: "test.Sleep",
                methods: vec![MethodSchema {
                    name: "Wait",
                    request_streaming: false,
                    response_streaming: false,
                }],
            };
            let descriptor = ServiceDescriptor::from_schema(&schema);

            struct ChildRecorder {
                cancelled_with: Arc<std::sync::Mutex<Option<RpcCode>>>,
            }

            impl crate::client_types::Cancellable for ChildRecorder {
                fn cancel(&self, status: crate::status::Status) {
                    *self.cancelled_with.lock().unwrap() = Some(status.code);
                }
            }

            let cancelled_with = Arc::new(std::sync::Mutex::new(None));
            let cancelled_with_for_handler = cancelled_with.clone();

            let mut app = RpcApp::new();
            app.add_service_from_schema(&descriptor).unwrap();
            app.add_method(
                "/test.Sleep/Wait",
                method_handler(
                    Some(string_unmarshal()),
                    Some(string_marshal()),
                    move |req, _res| {
                        let cancelled_with = cancelled_with_for_handler.clone();
                        async move {
                            req.add_child(ChildRecorder { cancelled_with }).await;
                            common::async_std::task::sleep(Duration::from_secs(5)).await;
                            Ok(())
                        }
                    },
                ),
            )
            .unwrap();

            let channel = channel_for(app);
            let response = channel.call(
                CallOptions {
                    path: "/test.Sleep/Wait".to_string(),
                    headers: Metadata::new(),
                    deadline: Some(Instant::now() + Duration::from_millis(20)),
                    grpc_timeout: None,
                    marshal: Some(string_marshal()),
                    unmarshal: Some(string_unmarshal()),
                },
                ClientStreamingRequest::unary("hi".to_string()),
            );

            let status = response.status().await.clone();
            assert_eq!(status.code, RpcCode::DeadlineExceeded);
            assert_eq!(*cancelled_with.lock().unwrap(), Some(RpcCode::DeadlineExceeded));
        });
    }

    /// §8 S5's client-side setup ("Client sets `grpc-timeout = 300m`") with
    /// no `deadline` at all: the client must still arm a local timer off
    /// `grpc_timeout` alone. Uses a connector that never resolves so the
    /// only thing that can produce a status here is the client's own timer.
    #[test]
    fn grpc_timeout_alone_still_arms_a_client_side_timer() {
        common::async_std::task::block_on(async {
            let hangs_forever: Connector = Arc::new(|_plain, _host, _port| {
                Box::pin(async move {
                    common::async_std::task::sleep(Duration::from_secs(2)).await;
                    Err(err_msg("connector should have been cancelled by the deadline"))
                })
            });

            let channel = Channel::new(ChannelOptions::default(), Arc::new(Pool::new(hangs_forever)));

            let response = channel.call(
                CallOptions::<String, String> {
                    path: "/test.Echo/Say".to_string(),
                    headers: Metadata::new(),
                    deadline: None,
                    grpc_timeout: Some("20m".to_string()),
                    marshal: Some(string_marshal()),
                    unmarshal: Some(string_unmarshal()),
                },
                ClientStreamingRequest::unary("hi".to_string()),
            );

            let status = response.status().await.clone();
            assert_eq!(status.code, RpcCode::DeadlineExceeded);
        });
    }
}
