//! # Ingress: HTTP entry point
//!
//! [`HttpIngress`] binds a listener and serves every connection with an
//! [`IngressService`]. The service is also usable directly as a
//! `tower::Service` for in-process calls and tests.
//!
//! Per request the ingress generates a [`RequestId`], resolves the caller's
//! [`SessionContext`](packtrack_core::SessionContext) from the bearer token
//! and puts both on a fresh [`Bus`] before dispatching.

use crate::error::{IngressError, IngressResult};
use crate::routes::{self, Route, RoutedRequest};
use bytes::Bytes;
use http::header::{AUTHORIZATION, HeaderValue};
use http::{Request, Response};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use matchit::Router;
use packtrack_core::bus::{Bus, RequestId};
use packtrack_db::{PackageService, RecordBook, SharedStore};
use packtrack_session::SessionRegistry;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::Service;
use tracing::Instrument;

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Everything the handlers need.
#[derive(Clone)]
pub struct AppState {
    pub packages: PackageService,
    pub records: RecordBook,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(store: SharedStore, passcode: Option<String>) -> Self {
        Self {
            packages: PackageService::new(store.clone()),
            records: RecordBook::new(store),
            sessions: Arc::new(SessionRegistry::new(passcode)),
        }
    }
}

/// HTTP ingress builder.
pub struct HttpIngress {
    addr: String,
    state: AppState,
}

impl HttpIngress {
    pub fn new(state: AppState) -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
            state,
        }
    }

    /// Set the bind address for the server.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Build the request service without binding a socket.
    pub fn into_raw_service(self) -> IngressResult<IngressService> {
        IngressService::new(self.state)
    }

    /// Run the HTTP server until the process is stopped.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.run_until(std::future::pending()).await
    }

    /// Run the HTTP server until `shutdown` resolves.
    ///
    /// Connections already accepted are left to finish on their own tasks.
    pub async fn run_until<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()>,
    {
        let addr: SocketAddr = self.addr.parse()?;
        let service = self.into_raw_service()?;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("packtrack HTTP ingress listening on http://{}", addr);

        tokio::pin!(shutdown);
        loop {
            let (stream, remote) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to accept connection");
                        continue;
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let service = service.clone();

            tokio::task::spawn(async move {
                let hyper_service = service_fn(move |req: Request<Incoming>| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(service.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, hyper_service)
                    .await
                {
                    tracing::error!(%remote, "Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// The request service behind [`HttpIngress`].
#[derive(Clone)]
pub struct IngressService {
    router: Arc<Router<Route>>,
    state: AppState,
}

impl IngressService {
    pub fn new(state: AppState) -> IngressResult<Self> {
        let router = routes::router()
            .map_err(|e| IngressError::Internal(format!("Invalid route table: {e}")))?;
        Ok(Self {
            router: Arc::new(router),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve one request. Never fails: errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let started = Instant::now();
        let request_id = RequestId::generate();
        let span = tracing::info_span!(
            "HTTPRequest",
            packtrack.http.method = %req.method(),
            packtrack.http.path = %req.uri().path(),
            packtrack.http.request_id = %request_id.0
        );

        async move {
            let header = HeaderValue::from_str(&request_id.0).ok();
            let mut response = match self.dispatch(req, request_id).await {
                Ok(response) => response,
                Err(err) => err.into_response(),
            };
            if let Some(value) = header {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            tracing::info!(
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch<B>(&self, req: Request<B>, request_id: RequestId) -> IngressResult<Response<Full<Bytes>>>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (route, code) = match self.router.at(req.uri().path()) {
            Ok(matched) => (
                *matched.value,
                matched.params.get("code").map(str::to_string),
            ),
            Err(_) => {
                return Err(IngressError::NotFound(format!(
                    "No route for {}",
                    req.uri().path()
                )));
            }
        };

        let (parts, body) = req.into_parts();
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bus = Bus::new();
        bus.insert(request_id);
        bus.insert(
            self.state
                .sessions
                .resolve_or_anonymous(authorization.as_deref()),
        );

        let body = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| IngressError::BadRequest(format!("Unreadable request body: {e}")))?
            .to_bytes();

        let request = RoutedRequest {
            method: parts.method,
            code,
            query: parts.uri.query().map(str::to_string),
            authorization,
            body,
        };
        routes::handle(&self.state, route, &request, &mut bus).await
    }
}

impl<B> Service<Request<B>> for IngressService
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
