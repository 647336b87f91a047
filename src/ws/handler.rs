//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnId, PlayerInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ArenaResponse, ClientMsg, ServerMsg};

/// Outbound queue depth per connection
const OUTBOUND_CAPACITY: usize = 64;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::Welcome { connection_id }).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    let (tx, mut rx) = mpsc::channel::<ServerMsg>(OUTBOUND_CAPACITY);
    state.sessions.register_connection(connection_id, tx.clone());

    // Spawn writer task: outbound queue -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let client = run_session(ClientSession::new(connection_id, tx), ws_stream, &state).await;
    client.close(&state).await;
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Reader loop. Returns the client state the connection ended with.
async fn run_session(
    mut client: ClientSession,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    state: &AppState,
) -> ClientSession {
    let connection_id = client.connection_id;

    while let Some(result) = ws_stream.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
                continue;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        };

        client.on_text(&text, state).await;
    }

    client
}

/// One connection's login and rate limit, fed by the reader loop
pub(crate) struct ClientSession {
    connection_id: ConnId,
    username: Option<String>,
    rate_limiter: PlayerRateLimiter,
    tx: mpsc::Sender<ServerMsg>,
}

impl ClientSession {
    pub(crate) fn new(connection_id: ConnId, tx: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            connection_id,
            username: None,
            rate_limiter: PlayerRateLimiter::new(),
            tx,
        }
    }

    pub(crate) fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Handle one text frame
    pub(crate) async fn on_text(&mut self, text: &str, state: &AppState) {
        match serde_json::from_str::<ClientMsg>(text) {
            Ok(msg) => self.on_message(msg, state).await,
            Err(e) => {
                warn!(connection_id = %self.connection_id, error = %e, "Failed to parse client message");
                self.reply(ServerMsg::Error {
                    message: "Malformed message".to_string(),
                })
                .await;
            }
        }
    }

    async fn on_message(&mut self, msg: ClientMsg, state: &AppState) {
        let connection_id = self.connection_id;

        match msg {
            ClientMsg::Login { username: name } => {
                let accepted = state.users.login(&name, connection_id);
                if accepted {
                    if let Some(previous) = self.username.replace(name.clone()) {
                        if previous != name {
                            state.users.logout(&previous, connection_id);
                            state.sessions.remove_user(&previous).await;
                        }
                    }
                }
                info!(connection_id = %connection_id, username = %name, accepted, "Login");
                self.reply(ServerMsg::LoginResult {
                    username: name,
                    accepted,
                })
                .await;
            }

            ClientMsg::Ready { arena_id } => {
                let Some(name) = self.logged_in().await else {
                    return;
                };
                if let Err(e) = state.sessions.player_ready(arena_id, name) {
                    warn!(connection_id = %connection_id, error = %e, "Ready rejected");
                    self.reply(ServerMsg::Error {
                        message: e.to_string(),
                    })
                    .await;
                }
            }

            ClientMsg::Hit { arena_id, event } => {
                if !self.rate_limiter.check_hit() {
                    warn!(connection_id = %connection_id, "Rate limited hit message");
                    return;
                }
                let Some(name) = self.logged_in().await else {
                    return;
                };

                let input = PlayerInput::click(arena_id, name, event);
                let response = match state.sessions.route_input(input).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Hit rejected");
                        ArenaResponse::error()
                    }
                };
                self.reply(ServerMsg::HitResult { arena_id, response }).await;
            }

            ClientMsg::Ping { t } => {
                self.reply(ServerMsg::Pong { t }).await;
            }
        }
    }

    /// Release the username and leave the lobby and every session
    pub(crate) async fn close(self, state: &AppState) {
        if let Some(name) = &self.username {
            state.users.logout(name, self.connection_id);
        }
        state
            .sessions
            .unregister_connection(self.connection_id, self.username.as_deref())
            .await;
    }

    async fn logged_in(&self) -> Option<&str> {
        if self.username.is_none() {
            self.reply(ServerMsg::Error {
                message: "Not logged in".to_string(),
            })
            .await;
        }
        self.username.as_deref()
    }

    /// Queue a direct reply to this connection
    async fn reply(&self, msg: ServerMsg) {
        if self.tx.send(msg).await.is_err() {
            debug!(connection_id = %self.connection_id, "Outbound channel closed");
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
