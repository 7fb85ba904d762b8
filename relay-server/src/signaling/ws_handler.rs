use crate::RelayContext;
use crate::signaling::SessionChannel;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub fn router(context: RelayContext) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(context)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(context): State<RelayContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: RelayContext) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let channel = SessionChannel::new(tx);
    info!(connection = %channel.id(), "New WebSocket connection");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let dispatcher = context.dispatcher();
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => dispatcher.handle_text(&channel, text.as_str()).await,
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => dispatcher.handle_text(&channel, text).await,
                Err(e) => warn!(connection = %channel.id(), "Non UTF-8 binary frame: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(connection = %channel.id(), "Reader loop finished");
    dispatcher.handle_disconnect(channel.id()).await;
    send_task.abort();

    info!(connection = %channel.id(), "WebSocket disconnected");
}
