use std::collections::HashMap;

use tracing::warn;

use verdin_core::traits::MemorySource;

/// Reserved variable holding the user's memory summary.
pub const MEMORIES_VAR: &str = "MEMORIES";

/// Run-scoped string key/value store used to parameterize prompts.
///
/// Keys are case-sensitive. The step executor mutates its own copy; the run
/// controller replaces its context wholesale after each committed step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableContext {
    values: HashMap<String, String>,
}

impl VariableContext {
    pub fn new() -> Self {
        let mut ctx = Self::default();
        ctx.values.insert(MEMORIES_VAR.to_string(), String::new());
        ctx
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Substitute `{{NAME}}` placeholders from the context. Placeholders
    /// without a matching key are left intact.
    pub fn render(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (key, value) in &self.values {
            let placeholder = format!("{{{{{key}}}}}");
            if out.contains(&placeholder) {
                out = out.replace(&placeholder, value);
            }
        }
        out
    }
}

/// Resolve the `MEMORIES` variable.
///
/// Memory is an enhancement, not a required input: when disabled, or when
/// the fetch fails for any reason, this resolves to the empty string and the
/// failure is logged, never surfaced.
pub async fn resolve_memories(source: &dyn MemorySource, disable_memory: bool) -> String {
    if disable_memory {
        return String::new();
    }
    match source.list().await {
        Ok(memories) => memories
            .iter()
            .enumerate()
            .map(|(index, text)| format!("[{index}] {text}\n"))
            .collect(),
        Err(e) => {
            warn!(error = %e, "Memory fetch failed, resolving MEMORIES to empty");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use verdin_core::error::{Result, VerdinError};

    struct FixedMemories(Vec<String>);

    impl MemorySource for FixedMemories {
        fn list(&self) -> BoxFuture<'_, Result<Vec<String>>> {
            let entries = self.0.clone();
            Box::pin(async move { Ok(entries) })
        }
    }

    struct FailingMemories;

    impl MemorySource for FailingMemories {
        fn list(&self) -> BoxFuture<'_, Result<Vec<String>>> {
            Box::pin(async { Err(VerdinError::Http("connection refused".into())) })
        }
    }

    #[test]
    fn test_memories_always_present() {
        let ctx = VariableContext::new();
        assert_eq!(ctx.get(MEMORIES_VAR), Some(""));
    }

    #[test]
    fn test_render_substitutes_known_keys() {
        let mut ctx = VariableContext::new();
        ctx.set("TOPIC", "herons");
        let rendered = ctx.render("Write about {{TOPIC}}. Context: {{MEMORIES}} Unknown: {{NOPE}}");
        assert_eq!(rendered, "Write about herons. Context:  Unknown: {{NOPE}}");
    }

    #[tokio::test]
    async fn test_resolve_formats_enumerated_list() {
        let source = FixedMemories(vec!["likes rust".into(), "lives in Kyoto".into()]);
        let resolved = resolve_memories(&source, false).await;
        assert_eq!(resolved, "[0] likes rust\n[1] lives in Kyoto\n");
    }

    #[tokio::test]
    async fn test_resolve_idempotent() {
        let source = FixedMemories(vec!["likes rust".into()]);
        let first = resolve_memories(&source, false).await;
        let second = resolve_memories(&source, false).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_disabled_is_empty() {
        let source = FixedMemories(vec!["should not appear".into()]);
        assert_eq!(resolve_memories(&source, true).await, "");
    }

    #[tokio::test]
    async fn test_resolve_swallows_fetch_failure() {
        assert_eq!(resolve_memories(&FailingMemories, false).await, "");
    }
}
