//! Route table and default fallback (§3 "RpcApp", §4.4 "Dispatcher").

use std::collections::HashMap;

use common::errors::*;

use crate::server::status_only_response;
use crate::service::{RouteHandler, ServiceDescriptor};
use crate::status::RpcCode;

use http::request::Request;
use http::response::Response;
use http::server_handler::{ServerHandler, ServerRequestContext};

/// A registered server: a fixed route table built up once at startup.
///
/// Registering an unknown route, the same service twice, or the same route
/// twice is a programmer error (§7 "Programmer errors") and fails
/// immediately rather than being deferred to request time.
pub struct RpcApp {
    routes: HashMap<String, RouteHandler>,
    required_routes: Vec<String>,
}

impl RpcApp {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            required_routes: Vec::new(),
        }
    }

    /// Reserves the route set a service's descriptor requires, so that
    /// `is_complete`/`missing_routes` can catch a forgotten `add_method`
    /// before the first request ever arrives.
    pub fn add_service_from_schema(&mut self, descriptor: &ServiceDescriptor) -> Result<()> {
        for route in descriptor.routes() {
            if self.required_routes.contains(&route) {
                return Err(format_err!("Service route registered twice: {}", route));
            }

            self.required_routes.push(route);
        }

        Ok(())
    }

    /// Registers the handler for a single method's route. `route` must have
    /// been reserved by a prior `add_service_from_schema` call.
    pub fn add_method(&mut self, route: impl Into<String>, handler: RouteHandler) -> Result<()> {
        let route = route.into();

        if !self.required_routes.iter().any(|r| r == &route) {
            return Err(format_err!("Registering handler for unknown route: {}", route));
        }

        if self.routes.contains_key(&route) {
            return Err(format_err!("Route registered twice: {}", route));
        }

        self.routes.insert(route, handler);
        Ok(())
    }

    /// Whether every route reserved by `add_service_from_schema` has a
    /// handler registered.
    pub fn is_complete(&self) -> bool {
        self.missing_routes().is_empty()
    }

    pub fn missing_routes(&self) -> Vec<String> {
        self.required_routes
            .iter()
            .filter(|route| !self.routes.contains_key(*route))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ServerHandler for RpcApp {
    async fn handle_request<'a>(&self, request: Request, context: ServerRequestContext<'a>) -> Response {
        let path = request.head.uri.path.as_str().to_string();
        let is_secure = context.connection_context.tls.is_some();

        match self.routes.get(&path) {
            Some(handler) => handler(request, is_secure).await,
            None => status_only_response(RpcCode::Unimplemented, format!("Unknown route: {}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{MethodSchema, ServiceSchema};

    fn schema() -> ServiceSchema {
        ServiceSchema {
            name: "test.Echo",
            methods: vec![MethodSchema {
                name: "Say",
                request_streaming: false,
                response_streaming: false,
            }],
        }
    }

    #[test]
    fn detects_missing_handler() {
        let mut app = RpcApp::new();
        let descriptor = ServiceDescriptor::from_schema(&schema());
        app.add_service_from_schema(&descriptor).unwrap();

        assert!(!app.is_complete());
        assert_eq!(app.missing_routes(), vec!["/test.Echo/Say".to_string()]);
    }

    #[test]
    fn rejects_handler_for_unknown_route() {
        use std::sync::Arc;

        let mut app = RpcApp::new();
        let handler: RouteHandler = Arc::new(|_req, _is_secure| {
            Box::pin(async { status_only_response(RpcCode::Ok, "") })
        });

        assert!(app.add_method("/test.Echo/Say", handler).is_err());
    }

    #[test]
    fn rejects_duplicate_service_registration() {
        let mut app = RpcApp::new();
        let descriptor = ServiceDescriptor::from_schema(&schema());
        app.add_service_from_schema(&descriptor).unwrap();
        assert!(app.add_service_from_schema(&descriptor).is_err());
    }
}
