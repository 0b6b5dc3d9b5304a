mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::db::Database;
use crate::ingest::Dispatcher;

pub use handlers::UPLOADED_BY_HEADER;
pub use middleware::SecurityConfig;

/// Shared handler state: the store for agent CRUD and the dispatcher for lists.
#[derive(Clone)]
pub struct AppState {
    db: Database,
    dispatcher: Dispatcher<Database>,
}

impl AppState {
    pub fn new(db: Database, roster_limit: usize) -> Self {
        let dispatcher = Dispatcher::new(Arc::new(db.clone()), roster_limit);
        Self { db, dispatcher }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Dispatcher<Database> {
    fn from_ref(state: &AppState) -> Self {
        state.dispatcher.clone()
    }
}

pub fn create_router(db: Database, config: &AppConfig, security: SecurityConfig) -> Router {
    let state = AppState::new(db, config.roster_limit);

    let protected = Router::new()
        // Lists
        .route(
            "/lists/upload",
            post(handlers::upload_list).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route("/lists", get(handlers::list_lists))
        .route("/lists/{id}", get(handlers::get_list))
        // Agents
        .route(
            "/agents",
            get(handlers::list_agents).post(handlers::create_agent),
        )
        .route(
            "/agents/{id}",
            get(handlers::get_agent)
                .put(handlers::update_agent)
                .delete(handlers::delete_agent),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ));

    let api = Router::new()
        // Health stays reachable without credentials
        .route("/health", get(handlers::health))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(security.cors_layer()),
        )
        .with_state(state)
}
