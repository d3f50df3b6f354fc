use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::warn;
use rst_common::with_tokio::tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::types::MessageHandler;

/// `InboundRelay` bridges the transport's synchronous handler callback into an async channel
#[derive(Clone)]
pub struct InboundRelay {
    sender: UnboundedSender<Value>,
}

impl InboundRelay {
    pub fn channel() -> (Self, UnboundedReceiver<Value>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl MessageHandler for InboundRelay {
    fn handle(&self, message: Value) {
        if self.sender.send(message).is_err() {
            warn!("[inbound:handle] receiver dropped, message discarded");
        }
    }
}
