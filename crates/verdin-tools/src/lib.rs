//! Tool layer: descriptor registry, OpenAPI-style definition adaptation,
//! dispatch routing, and the session-scoped tool catalog.

pub mod adapter;
pub mod catalog;
pub mod descriptor;
pub mod memory;
pub mod router;

pub use adapter::to_callable_tools;
pub use catalog::{HttpToolSource, ToolCatalog};
pub use descriptor::{DescriptorSet, ToolDescriptor};
pub use memory::{MemoryHandler, MemoryStore};
pub use router::{DispatchRouter, HandlerKind, RouterHandlers};
