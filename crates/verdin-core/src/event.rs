use crate::types::Message;

/// Incremental events emitted by a step while it runs.
///
/// Partial content is only ever visible through this channel; committed
/// history changes only when a step's final result is applied.
#[derive(Debug, Clone)]
pub enum StepEvent {
    /// The in-progress assistant message, re-sent with the same id and
    /// growing content for every streamed increment.
    PartialAssistant(Message),
    /// A requested tool call is being dispatched.
    ToolCallStarted { name: String, call_id: String },
    /// A dispatched tool call finished.
    ToolCallFinished {
        name: String,
        call_id: String,
        is_error: bool,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all step events.
pub struct StepEventBus {
    tx: tokio::sync::broadcast::Sender<StepEvent>,
}

impl StepEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: StepEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StepEvent> {
        self.tx.subscribe()
    }
}

impl Default for StepEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[tokio::test]
    async fn test_publish_without_receivers_is_silent() {
        let bus = StepEventBus::default();
        bus.publish(StepEvent::PartialAssistant(Message::assistant("hi")));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = StepEventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(StepEvent::ToolCallStarted {
            name: "search".into(),
            call_id: "call_1".into(),
        });
        match rx.recv().await.unwrap() {
            StepEvent::ToolCallStarted { name, call_id } => {
                assert_eq!(name, "search");
                assert_eq!(call_id, "call_1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
