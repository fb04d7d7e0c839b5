pub mod auth;
pub mod community;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod session;
pub mod uploads;
pub mod views;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use devlog_db::Database;
use devlog_gateway::connection;
use devlog_gateway::dispatcher::Dispatcher;

use crate::middleware::{require_admin, require_session};
use crate::uploads::UploadStore;

/// Body limit for the admin routes, so release archives fit in a single
/// publish. Every other route keeps axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub session_secret: String,
    pub uploads: UploadStore,
    /// Served verbatim as static files; uploads live in its `uploads/` subdirectory
    pub public_dir: PathBuf,
    /// Prefix for download links, e.g. `https://example.com`. Empty means site-relative.
    pub public_url: String,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(posts::home))
        .route("/community", get(community::community_page))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/api/version", get(posts::latest_version))
        .route("/ws", get(ws_upgrade));

    let member_routes = Router::new()
        .route("/community/post", post(community::create_community_post))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let admin_routes = Router::new()
        .route("/admin", get(posts::admin_page))
        .route("/add-post", post(posts::add_post))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
        .fallback_service(ServeDir::new(&state.public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, db))
}
