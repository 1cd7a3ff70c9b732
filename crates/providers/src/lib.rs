//! Outbound AI provider plumbing: the shared HTTP call client, the
//! one-shot completion engine and the streaming relay engine.

pub mod completion;
pub mod http;
pub mod relay;
pub mod request;
pub(crate) mod sse;

// Re-exports for convenience.
pub use completion::{CompletionEngine, CompletionParams};
pub use http::{CallClient, HttpCall, HttpReply, HttpTransport};
pub use relay::{RelayEngine, RelayHandle, RelayParams};
pub use request::{CompletionRequest, ProviderSettings};

#[cfg(test)]
pub(crate) mod testing;
