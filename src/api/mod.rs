//! HTTP API server for the voice assistant

pub mod health;
pub mod intent;
pub mod process;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use voice::{VoiceCapabilities, VoiceError};

use crate::config::Config;
use crate::pipeline::Orchestrator;
use crate::Result;

/// Upload cap for audio bodies
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state for API handlers
#[derive(Debug)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub capabilities: VoiceCapabilities,
}

/// Builder for the API server
pub struct ApiServerBuilder {
    orchestrator: Arc<Orchestrator>,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
    capabilities: VoiceCapabilities,
}

impl ApiServerBuilder {
    /// Create a new API server builder around an orchestrator
    ///
    /// Capabilities default to everything available; use
    /// [`Self::capabilities`] or [`Self::from_config`] to restrict them.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, port: u16) -> Self {
        Self {
            orchestrator,
            host: "0.0.0.0".to_string(),
            port,
            static_dir: None,
            capabilities: VoiceCapabilities {
                stt_available: true,
                tts_available: true,
                classifier_available: true,
            },
        }
    }

    /// Build a server from loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let orchestrator = Arc::new(Orchestrator::from_config(config));
        Self::new(orchestrator, config.server.port)
            .host(config.server.host.clone())
            .static_dir(config.server.static_dir.clone())
            .capabilities(VoiceCapabilities::from_config(config))
    }

    /// Set the bind address
    #[must_use]
    pub fn host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Set which collaborators are reported as configured
    #[must_use]
    pub const fn capabilities(mut self, capabilities: VoiceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            orchestrator: self.orchestrator,
            capabilities: self.capabilities,
        });

        ApiServer {
            state,
            host: self.host,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(process::router(self.state.clone()))
            .merge(intent::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve the web UI if configured, otherwise answer the root with a banner
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        } else {
            router = router.route(
                "/",
                get(|| async { Json(serde_json::json!({ "message": "Aura API running" })) }),
            );
        }

        // CORS layer for cross-origin requests from the browser UI
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any);

        router
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Address the server binds to
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = self.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(%addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
