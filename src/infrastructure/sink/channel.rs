//! Channel-backed result sink

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::gateway::{QueryResultMessage, ResultSink};
use crate::domain::DomainError;

/// Delivers results to per-session channels.
///
/// Transports (socket, SSE, queue) subscribe a session and forward what
/// they receive. Messages for sessions without a live subscriber are dropped.
#[derive(Debug, Default)]
pub struct ChannelResultSink {
    sessions: DashMap<String, mpsc::UnboundedSender<QueryResultMessage>>,
}

impl ChannelResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a session, replacing any previous subscriber
    pub fn subscribe(&self, session_id: &str) -> mpsc::UnboundedReceiver<QueryResultMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(session_id.to_string(), tx);
        debug!(%session_id, "Session subscribed to results");
        rx
    }

    pub fn unsubscribe(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn is_subscribed(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl ResultSink for ChannelResultSink {
    async fn send(&self, session_id: &str, message: QueryResultMessage) -> Result<(), DomainError> {
        let Some(tx) = self.sessions.get(session_id).map(|tx| tx.clone()) else {
            warn!(%session_id, message_id = %message.id, "No subscriber for session, result dropped");
            return Ok(());
        };

        if tx.send(message).is_err() {
            self.sessions.remove_if(session_id, |_, current| current.same_channel(&tx));
            warn!(%session_id, "Session channel closed, result dropped");
        }
        Ok(())
    }
}
