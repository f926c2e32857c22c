use async_trait::async_trait;
use services::{Notifier, SessionEvent};
use util::ws::{WebSocketManager, emit};

/// Publishes engine events on the session's WebSocket topic.
#[derive(Clone)]
pub struct WsNotifier {
    ws: WebSocketManager,
}

impl WsNotifier {
    pub fn new(ws: WebSocketManager) -> Self {
        Self { ws }
    }
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn notify(&self, event: SessionEvent) {
        let topic = event.topic();
        tracing::debug!(topic = %topic, event = event.name(), "Publishing session event");
        emit(&self.ws, &topic, event.name(), &event.payload()).await;
    }
}
