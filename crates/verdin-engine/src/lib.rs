//! Workflow execution engine.
//!
//! A workflow is a directed graph of conversation stages. The run controller
//! walks the graph, calling the step executor once per advancing node; a
//! step resolves dynamic variables, performs the model exchange (including
//! any inner tool-call rounds), and hands back the next node together with
//! the updated transcript and variable context. The run suspends at
//! `user-input` nodes until the caller supplies a new user message.

pub mod controller;
pub mod executor;
pub mod variables;
pub mod workflow;

pub use controller::RunController;
pub use executor::{StepExecutor, StepOutcome};
pub use variables::{resolve_memories, VariableContext, MEMORIES_VAR};
pub use workflow::{Node, NodeKind, Workflow};
