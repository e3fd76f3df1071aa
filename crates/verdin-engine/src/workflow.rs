use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use verdin_core::error::{Result, VerdinError};

/// An immutable, named directed graph of conversation stages.
///
/// Never mutated at run time; selecting a different workflow replaces the
/// whole structure and resets run state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    pub nodes: Vec<Node>,
}

/// A graph vertex. The next node is computed from the node's type and its
/// own transition rule rather than stored as explicit edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    /// Entry point. No user-visible effect; the run advances through it
    /// immediately.
    Start {
        #[serde(default)]
        next: Option<String>,
    },

    /// Suspension point: the run halts here until the UI supplies a new
    /// user message, then resumes at `next`.
    UserInput {
        #[serde(default)]
        next: Option<String>,
    },

    /// A stage that performs model/tool work.
    Prompt {
        /// Prompt template; `{{NAME}}` placeholders are filled from the
        /// variable context.
        template: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        temperature: Option<f32>,
        /// Callable set filter by function name; `None` allows all tools.
        #[serde(default)]
        allowed_tools: Option<Vec<String>>,
        /// Follow-up node; defaults to the graph's user-input node.
        #[serde(default)]
        next: Option<String>,
    },
}

impl NodeKind {
    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start { .. })
    }

    pub fn is_user_input(&self) -> bool {
        matches!(self, NodeKind::UserInput { .. })
    }

    /// The explicitly configured transition target, if any.
    pub fn next(&self) -> Option<&str> {
        match self {
            NodeKind::Start { next }
            | NodeKind::UserInput { next }
            | NodeKind::Prompt { next, .. } => next.as_deref(),
        }
    }
}

impl Workflow {
    /// Load a persisted workflow definition and validate it.
    pub fn from_json(raw: &str) -> Result<Self> {
        let workflow: Workflow =
            serde_json::from_str(raw).map_err(|e| VerdinError::Workflow(e.to_string()))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Check the graph invariants: exactly one `start` node, at least one
    /// `user-input` node, unique node ids, every configured `next`
    /// resolving to an existing node.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(VerdinError::Workflow(format!(
                    "Workflow '{}' has duplicate node id '{}'",
                    self.name, node.id
                )));
            }
        }

        let starts = self.nodes.iter().filter(|n| n.kind.is_start()).count();
        if starts != 1 {
            return Err(VerdinError::Workflow(format!(
                "Workflow '{}' must have exactly one start node, found {}",
                self.name, starts
            )));
        }

        if !self.nodes.iter().any(|n| n.kind.is_user_input()) {
            return Err(VerdinError::Workflow(format!(
                "Workflow '{}' has no user-input node",
                self.name
            )));
        }

        for node in &self.nodes {
            if let Some(next) = node.kind.next() {
                if self.node(next).is_none() {
                    return Err(VerdinError::Workflow(format!(
                        "Node '{}' transitions to unknown node '{}'",
                        node.id, next
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The single entry node.
    pub fn start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind.is_start())
    }

    /// The graph's suspension node (the first, in the confirmed
    /// linear/suspend model).
    pub fn user_input_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind.is_user_input())
    }

    /// The node a run advances to from `start`: the start node's `next`
    /// target if configured, else the first node that is not `start`.
    pub fn entry(&self) -> Option<&Node> {
        let start = self.start_node()?;
        match start.kind.next() {
            Some(next) => self.node(next),
            None => self.nodes.iter().find(|n| !n.kind.is_start()),
        }
    }

    /// The built-in plain chat workflow: suspend for input, respond, repeat.
    pub fn default_chat() -> Self {
        Self {
            name: "Chat".into(),
            nodes: vec![
                Node {
                    id: "start".into(),
                    kind: NodeKind::Start {
                        next: Some("chat".into()),
                    },
                },
                Node {
                    id: "chat".into(),
                    kind: NodeKind::UserInput {
                        next: Some("respond".into()),
                    },
                },
                Node {
                    id: "respond".into(),
                    kind: NodeKind::Prompt {
                        template: "You are a helpful assistant.\n\nThings you remember about the user:\n{{MEMORIES}}".into(),
                        model: None,
                        temperature: None,
                        allowed_tools: None,
                        next: None,
                    },
                },
            ],
        }
    }
}
