//! Runs the default chat workflow against a canned model so the engine's
//! control flow can be watched without any provider credentials.
//!
//! ```sh
//! cargo run -p verdin-engine --example chat_workflow
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::Mutex;

use verdin_core::config::Settings;
use verdin_core::error::{Result, VerdinError};
use verdin_core::event::{StepEvent, StepEventBus};
use verdin_core::traits::ModelClient;
use verdin_core::types::{ContentPart, ModelRequest, StopReason, StreamDelta};
use verdin_engine::{RunController, StepExecutor, Workflow};
use verdin_tools::router::{DispatchRouter, RouterHandlers};
use verdin_tools::{MemoryHandler, MemoryStore};

struct CannedModel {
    turns: Mutex<VecDeque<Vec<StreamDelta>>>,
}

impl ModelClient for CannedModel {
    fn chat_stream(
        &self,
        _request: ModelRequest,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        Box::pin(async move {
            let Some(deltas) = self.turns.lock().await.pop_front() else {
                return Err(VerdinError::ModelRequest("canned model exhausted".into()));
            };
            Ok(futures::stream::iter(deltas.into_iter().map(Ok)).boxed())
        })
    }
}

fn word_deltas(text: &str) -> Vec<StreamDelta> {
    let mut deltas: Vec<StreamDelta> = text
        .split_inclusive(' ')
        .map(|word| StreamDelta::TextDelta(word.to_string()))
        .collect();
    deltas.push(StreamDelta::Stop(StopReason::EndTurn));
    deltas
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let model = Arc::new(CannedModel {
        turns: Mutex::new(VecDeque::from(vec![word_deltas(
            "Hello! I remember you like herons. What shall we talk about today?",
        )])),
    });

    let store = Arc::new(MemoryStore::with_entries(vec!["likes herons".into()]));
    let memory_handler: Arc<dyn verdin_core::traits::ToolHandler> =
        Arc::new(MemoryHandler::new(store.clone()));
    let router = Arc::new(DispatchRouter::new(RouterHandlers {
        other_tools: memory_handler.clone(),
        memory: memory_handler.clone(),
        browser: memory_handler.clone(),
        image_generation: memory_handler.clone(),
        code_execution: memory_handler.clone(),
        search: memory_handler,
    }));

    let executor = Arc::new(StepExecutor::new(
        model,
        router,
        store,
        Arc::new(StepEventBus::default()),
        Settings::default(),
    ));

    let mut controller = RunController::new(Workflow::default_chat(), executor)?;
    let mut events = controller.subscribe();

    // Render partial assistant content as it streams.
    let renderer = tokio::spawn(async move {
        let mut current_id = String::new();
        let mut last_len = 0;
        while let Ok(event) = events.recv().await {
            if let StepEvent::PartialAssistant(message) = event {
                if message.id != current_id {
                    current_id = message.id.clone();
                    last_len = 0;
                }
                let text = message.text();
                print!("{}", &text[last_len..]);
                last_len = text.len();
            }
        }
        println!();
    });

    controller.run_until_suspended().await?;
    controller.push_user_message(vec![ContentPart::Text {
        text: "Hi there!".into(),
    }]);
    controller.run_until_suspended().await?;

    drop(controller);
    let _ = renderer.await;

    Ok(())
}
