//! In-memory WebSocket connections.

use std::sync::Arc;

use bamboo_realtime::{Frame, MockConnection, SharedConnection};
use bamboo_server::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::error::TestError;

/// A [`MockConnection`] opened against an engine.
///
/// Dropping the socket does not close it; call [`close`](Self::close) to
/// run the engine's close handling.
#[derive(Debug)]
pub struct TestSocket {
    engine: Arc<Engine>,
    mock: Arc<MockConnection>,
    conn: SharedConnection,
    accepted: bool,
}

impl TestSocket {
    pub(crate) fn new(
        engine: Arc<Engine>,
        mock: Arc<MockConnection>,
        conn: SharedConnection,
        accepted: bool,
    ) -> Self {
        Self {
            engine,
            mock,
            conn,
            accepted,
        }
    }

    /// Whether the engine accepted the connection on open.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// The underlying mock.
    #[must_use]
    pub fn mock(&self) -> &Arc<MockConnection> {
        &self.mock
    }

    /// Sends `{"event", "data"}` to the engine.
    pub async fn emit(&self, event: &str, data: impl Serialize) -> Result<(), TestError> {
        let raw = Frame::new(event, data).encode()?;
        self.send_raw(&raw).await
    }

    /// Sends a raw text message to the engine.
    pub async fn send_raw(&self, raw: &str) -> Result<(), TestError> {
        self.engine.handle_ws_message(&self.conn, raw).await?;
        Ok(())
    }

    /// Every frame received so far, decoded.
    #[must_use]
    pub fn received(&self) -> Vec<Value> {
        self.mock.sent_json()
    }

    /// Received frames for `event`.
    #[must_use]
    pub fn frames_for(&self, event: &str) -> Vec<Value> {
        self.mock.frames_for(event)
    }

    /// The `data` of the last frame received for `event`.
    #[must_use]
    pub fn last_data(&self, event: &str) -> Option<Value> {
        self.frames_for(event)
            .pop()
            .and_then(|mut frame| frame.get_mut("data").map(Value::take))
    }

    /// Forgets received frames.
    pub fn clear(&self) {
        self.mock.clear();
    }

    /// Whether the engine terminated the connection.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.mock.is_terminated()
    }

    /// Runs the engine's close handling.
    pub fn close(self) {
        self.engine.handle_ws_close(&self.conn);
    }
}

#[cfg(test)]
mod tests {
    use crate::TestClient;
    use bamboo_config::BambooConfig;
    use bamboo_realtime::{EventAction, EventHandler, MessageContext};
    use bamboo_server::EngineBuilder;
    use serde_json::json;

    fn client(require_token: bool) -> TestClient {
        let mut config = BambooConfig::default();
        config.realtime.require_token = require_token;
        let engine = EngineBuilder::from_config(config)
            .event(
                EventAction::new(
                    "echo",
                    EventHandler::raw(|mut ctx: MessageContext| async move {
                        let data = ctx.data().clone();
                        ctx.json(data)?;
                        Ok(ctx)
                    }),
                )
                .unwrap(),
            )
            .build()
            .unwrap();
        TestClient::new(engine)
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let client = client(false);
        let socket = client.connect(Some("t1")).await.unwrap();

        assert_eq!(socket.frames_for("connected").len(), 1);
        socket.emit("echo", json!({"n": 1})).await.unwrap();
        assert_eq!(socket.last_data("echo"), Some(json!({"n": 1})));

        socket.close();
        assert!(!client.engine().is_connected("t1"));
    }

    #[tokio::test]
    async fn test_missing_token_refused() {
        let client = client(true);
        let socket = client.connect(None).await.unwrap();
        assert!(!socket.is_accepted());
        assert!(socket.is_terminated());
    }
}
