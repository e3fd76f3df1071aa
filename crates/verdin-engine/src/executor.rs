use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use verdin_core::config::Settings;
use verdin_core::error::{Result, VerdinError};
use verdin_core::event::{StepEvent, StepEventBus};
use verdin_core::traits::{MemorySource, ModelClient};
use verdin_core::types::{
    ContentPart, FunctionSchema, Message, ModelRequest, StreamDelta, ToolCallRequest, ToolOutput,
};
use verdin_tools::router::{DispatchRouter, MEMORY_TOOL_ID};

use crate::variables::{resolve_memories, VariableContext, MEMORIES_VAR};
use crate::workflow::{NodeKind, Workflow};

/// Upper bound on model/tool exchanges within one step. The loop normally
/// terminates when a turn carries no tool calls; the cap stops a runaway
/// model from spinning forever.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// Accumulator for streaming tool call deltas.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

/// Result of one committed step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Where the run goes next; `None` means terminal.
    pub next_node: Option<String>,
    pub messages: Vec<Message>,
    pub variables: VariableContext,
}

/// Performs one unit of workflow work: a model exchange on a `prompt` node,
/// including any inner tool-call rounds.
///
/// The executor works on owned copies of the transcript and variable
/// context; on any failure or cancellation the caller's state is untouched.
pub struct StepExecutor {
    model: Arc<dyn ModelClient>,
    router: Arc<DispatchRouter>,
    memory: Arc<dyn MemorySource>,
    events: Arc<StepEventBus>,
    settings: Settings,
}

impl StepExecutor {
    pub fn new(
        model: Arc<dyn ModelClient>,
        router: Arc<DispatchRouter>,
        memory: Arc<dyn MemorySource>,
        events: Arc<StepEventBus>,
        settings: Settings,
    ) -> Self {
        Self {
            model,
            router,
            memory,
            events,
            settings,
        }
    }

    pub fn events(&self) -> &Arc<StepEventBus> {
        &self.events
    }

    /// Execute the step for `node_id`.
    ///
    /// Must only be called on a `prompt` node: `start` is advanced through
    /// by the run controller and `user-input` is a suspension state it owns.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        node_id: &str,
        messages: &[Message],
        variables: &VariableContext,
        tools: &[FunctionSchema],
        cancel: &CancellationToken,
    ) -> Result<StepOutcome> {
        let node = workflow
            .node(node_id)
            .ok_or_else(|| VerdinError::Workflow(format!("Unknown node '{node_id}'")))?;

        let NodeKind::Prompt {
            template,
            model: model_override,
            temperature,
            allowed_tools,
            next,
        } = node.kind.clone()
        else {
            return Err(VerdinError::Workflow(format!(
                "Step executor invoked on non-step node '{node_id}'"
            )));
        };

        if cancel.is_cancelled() {
            return Err(VerdinError::Cancelled);
        }

        let mut messages = messages.to_vec();
        let mut variables = variables.clone();

        let memories =
            resolve_memories(self.memory.as_ref(), self.settings.disable_memory).await;
        variables.set(MEMORIES_VAR, memories);
        let system_prompt = variables.render(&template);

        let callable: Vec<FunctionSchema> = tools
            .iter()
            .filter(|t| match &allowed_tools {
                Some(allow) => allow.iter().any(|a| a == &t.name),
                None => true,
            })
            .filter(|t| !(self.settings.disable_memory && t.route.tool_id == MEMORY_TOOL_ID))
            .cloned()
            .collect();
        let by_name: HashMap<&str, &FunctionSchema> =
            callable.iter().map(|t| (t.name.as_str(), t)).collect();

        for round in 0..MAX_TOOL_ROUNDS {
            debug!(node = %node_id, round, "Starting model exchange");

            let request = ModelRequest {
                model: model_override
                    .clone()
                    .unwrap_or_else(|| self.settings.model.model.clone()),
                system_prompt: Some(system_prompt.clone()),
                temperature: temperature.or(self.settings.model.temperature),
                messages: messages.clone(),
                tools: callable.clone(),
            };

            let mut stream = tokio::select! {
                result = self.model.chat_stream(request) => result?,
                () = cancel.cancelled() => return Err(VerdinError::Cancelled),
            };

            let mut draft = Message::assistant("");
            let mut calls: Vec<ToolCallAccumulator> = Vec::new();

            loop {
                let delta = tokio::select! {
                    delta = stream.next() => delta,
                    () = cancel.cancelled() => return Err(VerdinError::Cancelled),
                };
                let Some(delta) = delta else { break };

                match delta? {
                    StreamDelta::TextDelta(text) => {
                        append_text(&mut draft, &text);
                        self.events
                            .publish(StepEvent::PartialAssistant(draft.clone()));
                    }
                    StreamDelta::ToolCallStart { index, id, name } => {
                        while calls.len() <= index {
                            calls.push(ToolCallAccumulator::default());
                        }
                        calls[index].id = id;
                        calls[index].name = name;
                    }
                    StreamDelta::ToolArgumentsDelta { index, delta } => {
                        if let Some(call) = calls.get_mut(index) {
                            call.arguments.push_str(&delta);
                        }
                    }
                    StreamDelta::Stop(_) => {}
                }
            }
            drop(stream);

            draft.tool_calls = calls
                .iter()
                .map(|c| ToolCallRequest {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                })
                .collect();
            messages.push(draft);

            if calls.is_empty() {
                let next_node = next
                    .clone()
                    .or_else(|| workflow.user_input_node().map(|n| n.id.clone()));
                info!(node = %node_id, rounds = round + 1, "Step complete");
                return Ok(StepOutcome {
                    next_node,
                    messages,
                    variables,
                });
            }

            // One tool message per requested call, dispatch failures
            // converted into error payloads so the model can react.
            for call in &calls {
                let output = self.dispatch_call(&by_name, call, cancel).await?;
                let payload = if output.is_error {
                    serde_json::json!({ "error": output.content }).to_string()
                } else {
                    output.content
                };
                messages.push(Message::tool_result(call.id.clone(), payload));
            }
        }

        Err(VerdinError::ModelRequest(format!(
            "Tool-call loop did not terminate within {MAX_TOOL_ROUNDS} rounds"
        )))
    }

    /// Dispatch one requested call. Only cancellation propagates as `Err`;
    /// every other failure becomes an error `ToolOutput`.
    async fn dispatch_call(
        &self,
        by_name: &HashMap<&str, &FunctionSchema>,
        call: &ToolCallAccumulator,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let Some(schema) = by_name.get(call.name.as_str()) else {
            warn!(function = %call.name, "Model requested a function outside the callable set");
            return Ok(ToolOutput::error(format!(
                "Unknown function: {}",
                call.name
            )));
        };

        let arguments: serde_json::Value =
            serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);

        self.events.publish(StepEvent::ToolCallStarted {
            name: call.name.clone(),
            call_id: call.id.clone(),
        });

        let result = tokio::select! {
            result = self
                .router
                .dispatch(&schema.route.tool_id, &schema.route.operation, arguments) => result,
            () = cancel.cancelled() => return Err(VerdinError::Cancelled),
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                error!(function = %call.name, error = %e, "Tool dispatch failed");
                ToolOutput::error(e.to_string())
            }
        };

        self.events.publish(StepEvent::ToolCallFinished {
            name: call.name.clone(),
            call_id: call.id.clone(),
            is_error: output.is_error,
        });

        Ok(output)
    }
}

fn append_text(message: &mut Message, delta: &str) {
    if let Some(ContentPart::Text { text }) = message.content.first_mut() {
        text.push_str(delta);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::tests_support::stub_executor;

    fn greet_workflow() -> Workflow {
        Workflow::from_json(
            r#"{
                "name": "greeter",
                "nodes": [
                    { "id": "start", "type": "start", "next": "greet" },
                    { "id": "greet", "type": "prompt", "template": "Say hi" },
                    { "id": "input", "type": "user-input" }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_execute_on_start_node_is_invariant_violation() {
        let executor = stub_executor();
        let wf = greet_workflow();
        let err = executor
            .execute(
                &wf,
                "start",
                &[],
                &VariableContext::new(),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VerdinError::Workflow(_)));
    }

    #[tokio::test]
    async fn test_execute_on_unknown_node_fails() {
        let executor = stub_executor();
        let wf = greet_workflow();
        let err = executor
            .execute(
                &wf,
                "nope",
                &[],
                &VariableContext::new(),
                &[],
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VerdinError::Workflow(_)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_step_short_circuits() {
        let executor = stub_executor();
        let wf = greet_workflow();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor
            .execute(&wf, "greet", &[], &VariableContext::new(), &[], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, VerdinError::Cancelled));
    }
}
