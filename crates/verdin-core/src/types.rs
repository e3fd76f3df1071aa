use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One typed part of a message body. User turns may mix text with
/// image attachments; other roles carry a single text part.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { url: String },
}

/// A tool call requested by the model. `arguments` holds the raw JSON
/// argument string exactly as streamed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// An entry in the conversation transcript.
///
/// Messages are append-only within a run, except that the in-progress
/// assistant message is re-emitted with the same `id` and growing content
/// while streaming, before it is finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: vec![],
            tool_call_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::Text { text: text.into() }])
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::Text { text: text.into() }])
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::Text { text: text.into() }])
    }

    /// A `tool` role message carrying the serialized output (or error
    /// payload) for one dispatched call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, vec![ContentPart::Text { text: content.into() }]);
        msg.tool_call_id = Some(call_id.into());
        msg
    }

    /// Extract all text content from this message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Stop reason from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    ToolCalls,
    MaxTokens,
}

/// A streaming delta from the model.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A chunk of assistant text.
    TextDelta(String),

    /// Start of a tool call block.
    ToolCallStart {
        index: usize,
        id: String,
        name: String,
    },

    /// A chunk of tool call argument JSON.
    ToolArgumentsDelta { index: usize, delta: String },

    /// The turn is complete.
    Stop(StopReason),
}

/// Result of a tool dispatch, serialized for embedding in a `tool` message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Routing metadata carried by a callable schema so a resulting call can be
/// dispatched back to the correct handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRoute {
    pub tool_id: String,
    /// The operation id as declared in the tool's definition (the dispatch
    /// key, independent of any model-facing name disambiguation).
    pub operation: String,
    pub method: String,
    pub path: String,
}

/// The model-facing adaptation of one tool operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub route: OperationRoute,
}

/// A fully composed model call.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub messages: Vec<Message>,
    pub tools: Vec<FunctionSchema>,
}

/// One entry of the remote tool index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolListing {
    pub id: String,
    pub definition_url: String,
}
