//! Loopback axum server serving canned responses, for exercising remote
//! inputs without network access.

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Canned {
    Body { status: StatusCode, body: Bytes },
    Redirect { location: String },
}

type Routes = Arc<RwLock<HashMap<String, Canned>>>;

/// Serves fixed bodies by path. Unknown paths get a 404.
///
/// Routes can be added after the server started, so a route may point at
/// the server's own address. The server task is aborted on drop.
pub struct StaticHttpServer {
    addr: SocketAddr,
    routes: Routes,
    task: JoinHandle<()>,
}

impl StaticHttpServer {
    /// Binds to an ephemeral loopback port and starts serving.
    ///
    /// # Panics
    ///
    /// Panics if the loopback listener cannot be bound.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let routes: Routes = Arc::default();

        let app = Router::new()
            .fallback(respond)
            .with_state(Arc::clone(&routes));
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::debug!(error = %e, "Test HTTP server stopped");
            }
        });

        Self { addr, routes, task }
    }

    /// Registers a response for `path`.
    pub fn route(self, path: &str, status: u16, body: Vec<u8>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.insert(
            path,
            Canned::Body {
                status,
                body: Bytes::from(body),
            },
        );
        self
    }

    /// Registers a `302 Found` from `path` to `location`.
    pub fn redirect(self, path: &str, location: &str) -> Self {
        self.insert(
            path,
            Canned::Redirect {
                location: location.to_string(),
            },
        );
        self
    }

    fn insert(&self, path: &str, canned: Canned) {
        if let Ok(mut routes) = self.routes.write() {
            routes.insert(path.to_string(), canned);
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for StaticHttpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(State(routes): State<Routes>, uri: Uri) -> Response {
    let canned = routes
        .read()
        .ok()
        .and_then(|routes| routes.get(uri.path()).cloned());

    match canned {
        Some(Canned::Body { status, body }) => (
            status,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            body,
        )
            .into_response(),
        Some(Canned::Redirect { location }) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
