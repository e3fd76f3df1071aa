//! Routed dispatch of tool calls.
//!
//! The handler mapping is a closed set: every routable capability is a
//! `HandlerKind` variant with a well-known tool id, and `DispatchRouter`
//! construction requires a handler per variant. Adding a capability means
//! adding a variant, which the compiler then walks through every match.

use std::sync::Arc;

use tracing::debug;

use verdin_core::error::{Result, VerdinError};
use verdin_core::traits::ToolHandler;
use verdin_core::types::ToolOutput;

/// Well-known tool identifiers, as published in the tool index.
pub const OTHER_TOOLS_TOOL_ID: &str = "31ac14bb-b816-44de-b516-0ff49a22b629";
pub const MEMORY_TOOL_ID: &str = "ea802749-b7e7-4027-a01f-2761a54598c7";
pub const BROWSER_TOOL_ID: &str = "7eeb5eb8-bbcb-48e5-8f9b-e7b174c37cb0";
pub const IMAGE_GENERATION_TOOL_ID: &str = "bc9de670-35d2-420b-8e44-009fd236cfc9";
pub const CODE_EXECUTION_TOOL_ID: &str = "8d67c00d-b819-4117-b8e0-7c1c19b8f061";
pub const SEARCH_TOOL_ID: &str = "a9a0ba3c-3eab-4978-a909-a19eddb9335d";

/// The closed set of routable capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Catch-all for miscellaneous utility operations.
    OtherTools,
    Memory,
    Browser,
    ImageGeneration,
    CodeExecution,
    Search,
}

impl HandlerKind {
    /// Resolve a tool id to its handler variant.
    pub fn from_tool_id(tool_id: &str) -> Option<Self> {
        match tool_id {
            OTHER_TOOLS_TOOL_ID => Some(Self::OtherTools),
            MEMORY_TOOL_ID => Some(Self::Memory),
            BROWSER_TOOL_ID => Some(Self::Browser),
            IMAGE_GENERATION_TOOL_ID => Some(Self::ImageGeneration),
            CODE_EXECUTION_TOOL_ID => Some(Self::CodeExecution),
            SEARCH_TOOL_ID => Some(Self::Search),
            _ => None,
        }
    }
}

/// One handler per `HandlerKind` variant, wired at construction.
#[derive(Clone)]
pub struct RouterHandlers {
    pub other_tools: Arc<dyn ToolHandler>,
    pub memory: Arc<dyn ToolHandler>,
    pub browser: Arc<dyn ToolHandler>,
    pub image_generation: Arc<dyn ToolHandler>,
    pub code_execution: Arc<dyn ToolHandler>,
    pub search: Arc<dyn ToolHandler>,
}

/// Resolves a tool-call request to its handler and returns the result.
pub struct DispatchRouter {
    handlers: RouterHandlers,
}

impl DispatchRouter {
    pub fn new(handlers: RouterHandlers) -> Self {
        Self { handlers }
    }

    fn handler(&self, kind: HandlerKind) -> &Arc<dyn ToolHandler> {
        match kind {
            HandlerKind::OtherTools => &self.handlers.other_tools,
            HandlerKind::Memory => &self.handlers.memory,
            HandlerKind::Browser => &self.handlers.browser,
            HandlerKind::ImageGeneration => &self.handlers.image_generation,
            HandlerKind::CodeExecution => &self.handlers.code_execution,
            HandlerKind::Search => &self.handlers.search,
        }
    }

    /// Dispatch one operation to the handler owning `tool_id`.
    ///
    /// Unknown tool ids are a client-error outcome (`ToolNotFound`), never a
    /// panic; handlers report unknown operations themselves.
    pub async fn dispatch(
        &self,
        tool_id: &str,
        operation: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput> {
        let kind = HandlerKind::from_tool_id(tool_id)
            .ok_or_else(|| VerdinError::ToolNotFound(tool_id.to_string()))?;

        let handler = self.handler(kind);
        debug!(handler = handler.name(), %operation, "Dispatching tool call");
        handler.call(operation, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;

    struct EchoHandler(&'static str);

    impl ToolHandler for EchoHandler {
        fn name(&self) -> &str {
            self.0
        }

        fn call(
            &self,
            operation: &str,
            _arguments: serde_json::Value,
        ) -> BoxFuture<'_, Result<ToolOutput>> {
            let reply = format!("{}:{}", self.0, operation);
            Box::pin(async move { Ok(ToolOutput::success(reply)) })
        }
    }

    fn test_router() -> DispatchRouter {
        DispatchRouter::new(RouterHandlers {
            other_tools: Arc::new(EchoHandler("other")),
            memory: Arc::new(EchoHandler("memory")),
            browser: Arc::new(EchoHandler("browser")),
            image_generation: Arc::new(EchoHandler("image")),
            code_execution: Arc::new(EchoHandler("code")),
            search: Arc::new(EchoHandler("search")),
        })
    }

    #[test]
    fn test_kind_resolution() {
        assert_eq!(
            HandlerKind::from_tool_id(SEARCH_TOOL_ID),
            Some(HandlerKind::Search)
        );
        assert_eq!(
            HandlerKind::from_tool_id(MEMORY_TOOL_ID),
            Some(HandlerKind::Memory)
        );
        assert_eq!(HandlerKind::from_tool_id("no-such-tool"), None);
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_owner() {
        let router = test_router();
        let out = router
            .dispatch(BROWSER_TOOL_ID, "navigate", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(out.content, "browser:navigate");
    }

    #[tokio::test]
    async fn test_unknown_tool_id_is_client_error() {
        let router = test_router();
        let err = router
            .dispatch("deadbeef", "anything", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, VerdinError::ToolNotFound(_)));
    }
}
