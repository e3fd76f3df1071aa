use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use verdin_core::error::{Result, VerdinError};
use verdin_core::event::StepEvent;
use verdin_core::types::{ContentPart, FunctionSchema, Message};

use crate::executor::StepExecutor;
use crate::variables::VariableContext;
use crate::workflow::{Node, NodeKind, Workflow};

/// Drives a workflow run: repeatedly invokes the step executor until the
/// graph reaches a `user-input` node or a terminal state, and owns
/// cancellation.
///
/// The controller holds the canonical transcript and variable context; a
/// step receives copies and its result is committed wholesale after it
/// resolves. Steps run strictly sequentially.
pub struct RunController {
    workflow: Workflow,
    executor: Arc<StepExecutor>,
    tools: Vec<FunctionSchema>,
    current: Option<String>,
    messages: Vec<Message>,
    variables: VariableContext,
    cancel: CancellationToken,
}

impl RunController {
    pub fn new(workflow: Workflow, executor: Arc<StepExecutor>) -> Result<Self> {
        workflow.validate()?;
        let current = workflow.start_node().map(|n| n.id.clone());
        Ok(Self {
            workflow,
            executor,
            tools: Vec::new(),
            current,
            messages: Vec::new(),
            variables: VariableContext::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the workflow and reset all run state.
    pub fn set_workflow(&mut self, workflow: Workflow) -> Result<()> {
        workflow.validate()?;
        self.abort();
        self.current = workflow.start_node().map(|n| n.id.clone());
        self.messages.clear();
        self.variables = VariableContext::new();
        self.workflow = workflow;
        info!(workflow = %self.workflow.name, "Workflow selected, run state reset");
        Ok(())
    }

    /// Set the callable tool set offered to prompt nodes.
    pub fn set_tools(&mut self, tools: Vec<FunctionSchema>) {
        self.tools = tools;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn variables(&self) -> &VariableContext {
        &self.variables
    }

    pub fn current_node(&self) -> Option<&Node> {
        self.current.as_deref().and_then(|id| self.workflow.node(id))
    }

    /// Whether the run is waiting for user input.
    pub fn is_suspended(&self) -> bool {
        self.current_node()
            .is_some_and(|n| n.kind.is_user_input())
    }

    /// Whether the run has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// Token for aborting the in-flight step from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort any in-flight step; its stale result is discarded and the run
    /// stays at the last committed node.
    pub fn abort(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    /// Live step events (partial assistant messages, tool lifecycle).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StepEvent> {
        self.executor.events().subscribe()
    }

    /// Append a new user message. When the run is suspended at a
    /// `user-input` node, this moves it to that node's resume target.
    pub fn push_user_message(&mut self, parts: Vec<ContentPart>) {
        self.messages.push(Message::user_parts(parts));
        if let Some(node) = self.current_node() {
            if let NodeKind::UserInput { next } = &node.kind {
                if let Some(next) = next.clone() {
                    debug!(from = %node.id, to = %next, "Resuming from user input");
                    self.current = Some(next);
                }
            }
        }
    }

    /// Advance the run until it suspends at `user-input`, reaches a terminal
    /// state, or a step fails.
    ///
    /// A failed step leaves the run at the last committed node so a retry is
    /// possible. An aborted step is not an error: the run simply stays put
    /// and the stale result is dropped.
    pub async fn run_until_suspended(&mut self) -> Result<()> {
        loop {
            let Some(current) = self.current.clone() else {
                return Ok(());
            };
            let node = self
                .workflow
                .node(&current)
                .ok_or_else(|| VerdinError::Workflow(format!("Unknown node '{current}'")))?;

            match &node.kind {
                NodeKind::Start { .. } => {
                    // The entry node transitions immediately, without a step.
                    self.current = self.workflow.entry().map(|n| n.id.clone());
                }
                NodeKind::UserInput { .. } => return Ok(()),
                NodeKind::Prompt { .. } => {
                    let cancel = self.cancel.clone();
                    let result = self
                        .executor
                        .execute(
                            &self.workflow,
                            &current,
                            &self.messages,
                            &self.variables,
                            &self.tools,
                            &cancel,
                        )
                        .await;

                    match result {
                        Ok(outcome) => {
                            self.messages = outcome.messages;
                            self.variables = outcome.variables;
                            self.current = outcome.next_node;
                        }
                        Err(VerdinError::Cancelled) => {
                            debug!(node = %current, "Step aborted, discarding result");
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}
