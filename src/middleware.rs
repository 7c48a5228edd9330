/* src/middleware.rs */

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{Extensions, HeaderMap, request::Parts},
    response::Response,
};
use futures_util::future::BoxFuture;
use std::{
    convert::Infallible,
    net::SocketAddr,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::resolver::{HeaderSnapshot, Resolver};

/// Extension that holds the resolved client address.
///
/// The address is a best-effort string and may be empty when the request
/// carried only reserved hops and no connection info was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealIp(pub String);

impl RealIp {
    /// Get the resolved address.
    pub fn ip(&self) -> &str {
        &self.0
    }

    fn resolve(resolver: &Resolver, headers: &HeaderMap, extensions: &Extensions) -> Self {
        let remote_addr = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0.to_string())
            .unwrap_or_default();

        RealIp(resolver.resolve(&remote_addr, &HeaderSnapshot::from(headers)))
    }
}

/// Layer that resolves the client address of every request.
///
/// The result is stored as a [`RealIp`] request extension. The transport
/// address comes from `ConnectInfo<SocketAddr>`, so serve the router with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use realip::{RealIp, RealIpLayer};
///
/// async fn handler(real_ip: RealIp) -> String {
///     real_ip.ip().to_string()
/// }
///
/// let app: Router = Router::new()
///     .route("/", get(handler))
///     .layer(RealIpLayer::default());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RealIpLayer {
    resolver: Resolver,
}

impl RealIpLayer {
    /// Create a new layer with the default resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new layer with a custom resolver configuration.
    pub fn with_resolver(resolver: Resolver) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for RealIpLayer {
    type Service = RealIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RealIpService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

/// Service that resolves client addresses.
#[derive(Debug, Clone)]
pub struct RealIpService<S> {
    inner: S,
    resolver: Resolver,
}

impl<S> Service<Request> for RealIpService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let real_ip = RealIp::resolve(&self.resolver, req.headers(), req.extensions());
        req.extensions_mut().insert(real_ip);

        Box::pin(self.inner.call(req))
    }
}

/// Axum extractor for the resolved client address.
///
/// Uses the value inserted by [`RealIpLayer`] when present, otherwise
/// resolves it from the request with the default [`Resolver`].
impl<S> FromRequestParts<S> for RealIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(real_ip) = parts.extensions.get::<RealIp>() {
            return Ok(real_ip.clone());
        }

        Ok(RealIp::resolve(
            &Resolver::default(),
            &parts.headers,
            &parts.extensions,
        ))
    }
}
