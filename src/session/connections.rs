//! Registry of live client connections

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::game::ConnId;
use crate::ws::protocol::ServerMsg;

/// Outbound channel of every connected client
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnId, mpsc::Sender<ServerMsg>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: ConnId, tx: mpsc::Sender<ServerMsg>) {
        self.connections.insert(connection_id, tx);
    }

    pub fn unregister(&self, connection_id: ConnId) -> bool {
        self.connections.remove(&connection_id).is_some()
    }

    /// Best-effort delivery. Unknown, closed or lagging connections drop the message.
    pub fn send(&self, connection_id: ConnId, msg: ServerMsg) -> bool {
        let Some(tx) = self.connections.get(&connection_id).map(|c| c.value().clone()) else {
            debug!(connection_id = %connection_id, event = msg.event_type(), "No such connection");
            return false;
        };

        match tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(msg)) => {
                warn!(
                    connection_id = %connection_id,
                    event = msg.event_type(),
                    "Connection lagging, message dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %connection_id, "Connection closed");
                false
            }
        }
    }

    pub fn contains(&self, connection_id: ConnId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
