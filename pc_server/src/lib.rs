//! Hosting environment for a single party card game session: one hub
//! actor behind a WebSocket endpoint.

pub mod hub;
pub mod ws;

use axum::{Router, routing::get};

use hub::HubHandle;

/// Build the router: one WebSocket route backed by the hub.
pub fn create_router(hub: HubHandle) -> Router {
    Router::new()
        .route("/ws", get(ws::websocket_handler))
        .with_state(hub)
}
