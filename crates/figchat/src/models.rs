//! These models represent the objects passed around by the agent
//!
//! There are several different related formats we need to interact with:
//! - chat messages, sent from the interface to the agent
//! - openai-compatible messages/tools, sent from the agent to the LLM
//! - openai-compatible chunks, streamed from the LLM back through the agent
//! - MCP content items, returned by the design server for each tool call
//!
//! These all overlap to varying degrees. We always immediately convert those data models
//! into the internal structs using to/from helpers.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
