//! Dev server setup.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Resolve every request against the proxy table
//! - Forward matched requests to the upstream target
//! - Serve plugin-claimed files through the transformer
//! - Serve project files for everything else
//!
//! # Design Decisions
//! - The configuration is read through `ArcSwap`; a reload swaps it whole and
//!   requests in flight keep the snapshot they loaded
//! - Upstream failures map to 502, never to a panic
//! - Bind address and request timeout are read once at startup; a reload
//!   only swaps plugins, proxy rules and output

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::build::{CopyTransformer, Transformer};
use crate::compose::BuildConfiguration;
use crate::http::assets::transform_asset;
use crate::http::forward::{prepare_headers, upstream_uri};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::routing::ProxyRule;

/// Configuration handle shared between the server and the reload task.
pub type SharedConfig = Arc<ArcSwap<BuildConfiguration>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub client: Client<HttpConnector, Body>,
    pub transformer: Arc<dyn Transformer>,
}

/// HTTP dev server.
pub struct DevServer {
    state: AppState,
}

impl DevServer {
    /// Create a dev server over a composed configuration.
    pub fn new(config: Arc<BuildConfiguration>) -> Self {
        Self::with_shared(Arc::new(ArcSwap::new(config)))
    }

    /// Create a dev server over a configuration handle that may be swapped.
    pub fn with_shared(config: SharedConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            state: AppState {
                config,
                client,
                transformer: Arc::new(CopyTransformer),
            },
        }
    }

    /// Serve claimed files through `transformer` instead of copying them.
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.state.transformer = Arc::new(transformer);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, timeout: Duration) -> Router {
        Router::new()
            .fallback(dev_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(timeout))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Handle for swapping in a recomposed configuration.
    pub fn shared_config(&self) -> SharedConfig {
        self.state.config.clone()
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let timeout = {
            let config = self.state.config.load();
            tracing::info!(
                address = %addr,
                root = %config.project_root().display(),
                proxy_rules = config.proxy().len(),
                plugins = config.plugins().len(),
                "Dev server listening"
            );
            Duration::from_secs(config.server().request_timeout_secs)
        };

        let router = Self::build_router(self.state, timeout);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Dev server stopped");
        Ok(())
    }
}

/// Proxy matched paths, serve files for the rest.
async fn dev_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let config = state.config.load_full();
    let path = request.uri().path().to_string();

    match config.proxy().resolve(&path) {
        Some(rule) => forward(&state, rule, request).await,
        None => match transform_asset(state.transformer.as_ref(), &config, &path).await {
            Some(response) => response,
            None => serve_file(config.project_root(), request).await,
        },
    }
}

async fn forward(state: &AppState, rule: &ProxyRule, request: Request<Body>) -> Response {
    let id = request_id(&request).to_string();
    let (mut parts, body) = request.into_parts();

    let uri = match upstream_uri(rule, &parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %id, prefix = rule.prefix(), error = %e, "Cannot build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };

    tracing::debug!(
        request_id = %id,
        method = %parts.method,
        prefix = rule.prefix(),
        upstream = %uri,
        rewrite_origin = rule.rewrite_origin,
        "Proxying request"
    );

    prepare_headers(&mut parts.headers, rule);
    parts.uri = uri;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %id, target = %rule.target, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

async fn serve_file(root: &Path, request: Request<Body>) -> Response {
    let result: Result<_, Infallible> = ServeDir::new(root).oneshot(request).await;
    match result {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
