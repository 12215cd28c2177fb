use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::stream::ProviderChunk;

/// Chunks of one model turn, in arrival order
pub type ChunkStream = BoxStream<'static, Result<ProviderChunk>>;

/// Base trait for chat model providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Start a streamed completion for the conversation, offering `tools` with tool
    /// choice left to the model.
    ///
    /// Errors that occur before the first chunk (bad status, rate limiting) are returned
    /// here rather than inside the stream.
    async fn stream(&self, messages: &[Message], tools: &[Tool]) -> Result<ChunkStream>;
}
