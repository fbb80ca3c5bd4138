use crate::protocol::{ClientMessage, SessionFrame};
use crate::shell::{RenderMode, SESSION_PATH, render_initial};
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use morph_core::{ModuleLoader, Session, SessionState};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Serves the playground: page shell, favicon and the live session socket.
/// Every socket gets its own session; the module loader is shared.
#[derive(Clone)]
pub struct AxumMorphAdapter {
    loader: Arc<ModuleLoader>,
    mode: RenderMode,
    static_dir: Option<PathBuf>,
}

impl AxumMorphAdapter {
    pub fn new(loader: Arc<ModuleLoader>) -> Self {
        Self {
            loader,
            mode: RenderMode::Server,
            static_dir: None,
        }
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Files served when server-side rendering is off. Unknown paths fall
    /// back to `index.html` in the same directory.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn render_page(&self) -> Response {
        match render_initial(self.mode) {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "page shell render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("render failed: {e}")).into_response()
            }
        }
    }

    pub fn router(self) -> Router {
        let router = Router::new()
            .route("/favicon.ico", get(favicon))
            .route(SESSION_PATH, get(session_socket));

        let router = match (self.mode, self.static_dir.clone()) {
            (RenderMode::Static, Some(dir)) => {
                let index = dir.join("index.html");
                router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
            }
            _ => router.route("/", get(page)).route("/{*path}", get(page)),
        };

        router
            .with_state(self)
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
    }
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn page(State(adapter): State<AxumMorphAdapter>) -> Response {
    adapter.render_page()
}

async fn session_socket(ws: WebSocketUpgrade, State(adapter): State<AxumMorphAdapter>) -> Response {
    ws.on_upgrade(move |socket| handle_session_socket(socket, adapter.loader))
}

async fn send_frame(socket: &mut WebSocket, state: &SessionState) -> Result<(), axum::Error> {
    let frame = SessionFrame::from_state(state);
    let text = match serde_json::to_string(&frame) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode session frame");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}

async fn handle_session_socket(mut socket: WebSocket, loader: Arc<ModuleLoader>) {
    let session = Session::spawn(loader);
    let mut snapshots = session.subscribe();
    tracing::debug!("session socket opened");

    let initial = snapshots.borrow_and_update().clone();
    if send_frame(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(msg) => {
                                if session.dispatch(msg.into()).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "ignoring malformed session message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                if send_frame(&mut socket, &state).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("session socket closed");
}
