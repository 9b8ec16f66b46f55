//! HTTP transport: maps axum requests onto a hosted pipeline.
//!
//! Requires the `http` feature. Every request below the host's root path
//! (which may be a route template such as `/tenants/{tenant}`) is handed to
//! the dispatcher; anything else gets a bare 404.
//!
//! ## Example
//!
//! ```ignore
//! let manager = HostManager::new(catalog)
//!     .with_transport(Arc::new(HttpTransport::current()));
//!
//! let host = manager.register_host("customers", None, "http://127.0.0.1:0/api", HostOptions::default())?;
//! // POST {host.listen_address()}/GetCustomer  { "Id": "42" }
//! ```

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::transport::{Endpoint, Listener, Transport};
use crate::binding::Dispatcher;
use crate::error::HostError;
use crate::pipeline::{product, Identity, RouteTemplate, WireRequest, WireResponse, PRODUCT_HEADER};

#[derive(Clone)]
struct HostState {
    dispatcher: Arc<dyn Dispatcher>,
    root: Arc<RouteTemplate>,
}

/// Build an axum `Router` serving `dispatcher` below `root`.
pub fn router(dispatcher: Arc<dyn Dispatcher>, root: &str, body_limit: usize) -> Router {
    let state = HostState {
        dispatcher,
        root: Arc::new(RouteTemplate::parse(root)),
    };
    Router::new()
        .fallback(dispatch_handler)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Serve `dispatcher` over HTTP at `addr` (e.g. `"0.0.0.0:3000"`) until the
/// server fails.
pub async fn serve(
    dispatcher: Arc<dyn Dispatcher>,
    addr: &str,
    root: &str,
) -> Result<(), std::io::Error> {
    let app = router(dispatcher, root, super::MessageSize::Normal.max_bytes());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn dispatch_handler(
    State(state): State<HostState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(matched) = state.root.match_path(uri.path()) else {
        return (StatusCode::NOT_FOUND, [(PRODUCT_HEADER, product())]).into_response();
    };

    let mut request = WireRequest::new(method.as_str(), matched.fragment);
    request.query = uri.query().map(str::to_string);
    request.route_values = matched.values;
    request.headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    request.identity = Identity::from_headers(
        request
            .headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str())),
    );
    request.secure = request
        .header("x-forwarded-proto")
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
    request.body = body.to_vec();

    to_response(state.dispatcher.handle(request).await)
}

fn to_response(wire: WireResponse) -> Response {
    let status = StatusCode::from_u16(wire.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(wire.body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in wire.headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            tracing::warn!(header = %name, "dropping header not valid on the wire");
            continue;
        };
        headers.append(name, value);
    }
    response
}

/// Opens `http://` endpoints on a tokio runtime.
pub struct HttpTransport {
    runtime: Handle,
}

impl HttpTransport {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context. Panics outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Transport for HttpTransport {
    fn scheme(&self) -> &str {
        "http"
    }

    fn open(&self, endpoint: Endpoint) -> Result<Box<dyn Listener>, HostError> {
        let transport = |e: std::io::Error| HostError::Transport(e.to_string());

        let std_listener = StdTcpListener::bind(endpoint.address.authority.as_str()).map_err(transport)?;
        std_listener.set_nonblocking(true).map_err(transport)?;
        let local = std_listener.local_addr().map_err(transport)?;

        let _guard = self.runtime.enter();
        let listener = tokio::net::TcpListener::from_std(std_listener).map_err(transport)?;
        let app = router(
            endpoint.dispatcher,
            &endpoint.address.path,
            endpoint.binding.max_message_bytes,
        );
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = self.runtime.spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "http listener failed");
            }
        });

        Ok(Box::new(HttpListener {
            runtime: self.runtime.clone(),
            local_address: format!("http://{}{}", local, endpoint.address.path),
            shutdown: Some(shutdown),
            task,
        }))
    }
}

struct HttpListener {
    runtime: Handle,
    local_address: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Listener for HttpListener {
    fn local_address(&self) -> String {
        self.local_address.clone()
    }

    /// Stop accepting and wait until the socket is released, so the same
    /// address can be bound again as soon as this returns. Connections
    /// already accepted run on their own tasks and drain gracefully.
    ///
    /// On a current-thread runtime the wait would deadlock; the port is then
    /// released once the runtime next polls the aborted task.
    fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());
        self.task.abort();

        let task = &mut self.task;
        match Handle::try_current() {
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                tracing::warn!(
                    address = %self.local_address,
                    "closing http listener on a current-thread runtime, port is released asynchronously"
                );
            }
            Ok(_) => tokio::task::block_in_place(|| {
                let _ = self.runtime.block_on(task);
            }),
            Err(_) => {
                let _ = self.runtime.block_on(task);
            }
        }
    }
}

impl Drop for HttpListener {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}
