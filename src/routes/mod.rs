use crate::middleware::{self, auth};
use crate::state::AppState;
use crate::websocket::handlers::ws_handler;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

pub mod attachments;
pub mod broadcasts;
pub mod conversations;
pub mod messages;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/conversations",
            post(conversations::open_direct).get(conversations::list_conversations),
        )
        .route(
            "/conversations/unread-summary",
            get(conversations::unread_summary),
        )
        .route("/conversations/groups", post(conversations::create_group))
        .route(
            "/conversations/:id",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/conversations/:id/members",
            post(conversations::add_members),
        )
        .route(
            "/conversations/:id/messages",
            post(messages::send_message).get(messages::get_message_history),
        )
        .route("/conversations/:id/read", post(conversations::mark_read))
        .route("/conversations/:id/unread", get(conversations::unread))
        .route(
            "/messages/:id",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/messages/:id/read", post(messages::record_message_read))
        .route("/broadcasts", post(broadcasts::create_broadcast))
        .route(
            "/broadcasts/:id",
            get(broadcasts::get_broadcast).delete(broadcasts::delete_broadcast),
        )
        .route(
            "/broadcasts/:id/recipients",
            post(broadcasts::add_recipients),
        )
        .route("/broadcasts/:id/send", post(broadcasts::send_broadcast))
        .route("/attachments", post(attachments::upload_attachment))
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    // The socket route authenticates inside the handler (query token) and so
    // stays outside the bearer-header layer.
    let ws = Router::new().route("/ws", get(ws_handler));

    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    let router = introspection
        .merge(Router::new().nest("/api/v1", api.merge(ws)))
        .with_state(state);
    middleware::with_defaults(router)
}
