pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cairn_api::auth::{self, AppState, AppStateInner};
use cairn_api::messages;
use cairn_api::middleware::require_auth;
use cairn_db::Database;
use cairn_gateway::{EventBus, connection};

#[derive(Clone)]
struct ServerState {
    app: AppState,
    /// Parent of every connection's cancellation token.
    shutdown: CancellationToken,
}

/// Shared state for one running server.
pub fn app_state(db: Database, jwt_secret: String, bus: EventBus) -> AppState {
    Arc::new(AppStateInner {
        db,
        jwt_secret,
        bus,
    })
}

/// Build the full HTTP + WebSocket router. Cancelling `shutdown` ends every
/// live gateway connection.
pub fn router(app_state: AppState, shutdown: CancellationToken) -> Router {
    let state = ServerState {
        app: app_state.clone(),
        shutdown,
    };

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/messages", get(messages::get_messages).post(messages::post_message))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(
            socket,
            state.app.bus.clone(),
            state.app.jwt_secret.clone(),
            state.shutdown,
        )
    })
}
