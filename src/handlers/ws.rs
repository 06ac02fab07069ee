use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};

use crate::auth::AuthError;
use crate::state::AppState;
use crate::ws::CLOSE_UNAUTHORIZED;

// RFC 6455 caps the close reason at 123 bytes.
const MAX_CLOSE_REASON: usize = 120;

/// GET {ws_path} - upgrade, then register the socket under the cookie's subject.
///
/// The upgrade always succeeds; a bad session is reported by closing the
/// socket with `CLOSE_UNAUTHORIZED`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let user = state.verifier.verify_cookie(&headers).await;

    ws.on_upgrade(move |socket| async move {
        let user = match user {
            Ok(user) => user,
            Err(e) => return reject(socket, e).await,
        };

        // register first so updates after the snapshot are queued behind it
        let connection = state.sockets.register(&user.sub).await;
        state.itineraries.send_snapshot(&user.sub, &connection).await;
        state.sockets.serve(&user.sub, connection, socket).await;
    })
}

async fn reject(mut socket: WebSocket, err: AuthError) {
    tracing::debug!("closing unauthenticated websocket: {}", err);
    let reason: String = err.to_string().chars().take(MAX_CLOSE_REASON).collect();
    let frame = CloseFrame {
        code: CLOSE_UNAUTHORIZED,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
