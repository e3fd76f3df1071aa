use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::*;

/// Model call boundary — the provider's wire protocol lives behind this.
pub trait ModelClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        request: ModelRequest,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// One external capability (browser control, code execution, search, ...).
///
/// A handler receives the operation id and its JSON arguments and returns
/// structured text or a typed error. Everything past this contract is a
/// black box to the engine.
pub trait ToolHandler: Send + Sync + 'static {
    /// Handler name, for logging.
    fn name(&self) -> &str;

    /// Invoke one operation.
    fn call(
        &self,
        operation: &str,
        arguments: serde_json::Value,
    ) -> BoxFuture<'_, Result<ToolOutput>>;
}

/// Read-only memory fetch used to build the `MEMORIES` variable.
pub trait MemorySource: Send + Sync + 'static {
    /// Ordered list of prior memory strings.
    fn list(&self) -> BoxFuture<'_, Result<Vec<String>>>;
}

/// Tool listing fetch boundary: an index of `{id, definition_url}` pairs
/// plus a per-id definition document fetch.
pub trait ToolSource: Send + Sync + 'static {
    fn list(&self) -> BoxFuture<'_, Result<Vec<ToolListing>>>;

    fn fetch_definition(&self, listing: &ToolListing) -> BoxFuture<'_, Result<String>>;
}
