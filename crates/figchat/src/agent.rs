use anyhow::Result;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::Provider;
use crate::stream::{adapt_chunk, CompletionChunk, TurnAccumulator};
use crate::systems::System;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for exploring Figma designs. \
Use the available tools to inspect files, nodes and variables before answering, and answer concisely.";

/// What the agent emits while replying
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// A model output chunk, already in the downstream shape
    Chunk(CompletionChunk),
    /// A message appended to the conversation: the assistant turn, or one tool result
    Message(Message),
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
#[derive(Clone)]
pub struct Agent {
    systems: Vec<Arc<dyn System>>,
    provider: Arc<dyn Provider>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl Agent {
    /// Create a new Agent. A turn that still requests tools after `max_tool_rounds`
    /// rounds of tool execution ends the reply with an error.
    pub fn new(provider: Arc<dyn Provider>, max_tool_rounds: usize) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_rounds,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Arc<dyn System>) {
        self.systems.push(system);
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Tools from every system, as offered to the model
    pub fn tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    fn system_for_tool(&self, name: &str) -> Option<&Arc<dyn System>> {
        self.systems
            .iter()
            .find(|system| system.tools().iter().any(|tool| tool.name == name))
    }

    /// Dispatch a single tool call to the system that owns it
    async fn dispatch_tool_call(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<Vec<Content>> {
        let call = tool_call?;
        let system = self
            .system_for_tool(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        system.call(call).await
    }

    /// Create a stream of the agent's reply to the conversation.
    ///
    /// Model chunks are forwarded as they arrive. After each model turn the assistant
    /// message is emitted; if it requested tools, they run concurrently and one tool
    /// result message per request follows, in request order, before the model is asked
    /// again.
    pub fn reply(&self, messages: &[Message]) -> BoxStream<'static, Result<ReplyEvent>> {
        let agent = self.clone();
        let tools = self.tools();

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system().with_text(&self.system_prompt));
        conversation.extend_from_slice(messages);

        Box::pin(async_stream::try_stream! {
            let mut rounds = 0;

            loop {
                let mut chunks = agent.provider.stream(&conversation, &tools).await?;
                let mut turn = TurnAccumulator::new();

                while let Some(chunk) = chunks.next().await {
                    let chunk = adapt_chunk(chunk?);
                    turn.push(&chunk);
                    yield ReplyEvent::Chunk(chunk);
                }

                debug!(finish_reason = ?turn.finish_reason(), "Model turn complete");
                let response = turn.into_message();
                conversation.push(response.clone());

                let tool_requests: Vec<ToolRequest> =
                    response.tool_requests().into_iter().cloned().collect();
                yield ReplyEvent::Message(response);

                if tool_requests.is_empty() {
                    break;
                }

                if rounds >= agent.max_tool_rounds {
                    Err::<(), _>(AgentError::MaxToolRoundsExceeded(agent.max_tool_rounds))?;
                }
                rounds += 1;
                info!(round = rounds, requests = tool_requests.len(), "Executing tool calls");

                // Dispatch in parallel but wait until every call has finished
                let futures: Vec<_> = tool_requests
                    .iter()
                    .map(|request| agent.dispatch_tool_call(request.tool_call.clone()))
                    .collect();
                let outputs = futures::future::join_all(futures).await;

                for (request, output) in tool_requests.iter().zip(outputs) {
                    let result = Message::tool(request.id.clone(), request.tool_name(), output);
                    conversation.push(result.clone());
                    yield ReplyEvent::Message(result);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use crate::models::role::Role;
    use crate::providers::mock::{finish_chunk, text_chunk, tool_call_chunk, MockProvider};
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::json;
    use std::time::Duration;

    // Mock system for testing
    struct MockSystem {
        tools: Vec<Tool>,
    }

    impl MockSystem {
        fn new() -> Self {
            Self {
                tools: vec![
                    Tool::new("echo", "Echoes back the input", json!({"type": "object"})),
                    Tool::new("fail", "Always fails", json!({"type": "object"})),
                ],
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            "test"
        }

        fn description(&self) -> &str {
            "A system for testing"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
            match tool_call.name.as_str() {
                "echo" => {
                    // Later calls finish first so ordering is not an accident
                    let delay = tool_call.arguments["delay"].as_u64().unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(vec![Content::text(tool_call.arguments["message"].to_string())])
                }
                _ => Err(AgentError::ExecutionError("nope".to_string())),
            }
        }
    }

    fn agent_with(provider: &MockProvider, max_tool_rounds: usize) -> Agent {
        let mut agent =
            Agent::new(Arc::new(provider.clone()), max_tool_rounds).with_system_prompt("sys");
        agent.add_system(Arc::new(MockSystem::new()));
        agent
    }

    async fn messages_of(agent: &Agent, history: &[Message]) -> Result<Vec<Message>> {
        let events: Vec<ReplyEvent> = agent.reply(history).try_collect().await?;
        Ok(events
            .into_iter()
            .filter_map(|event| match event {
                ReplyEvent::Message(message) => Some(message),
                ReplyEvent::Chunk(_) => None,
            })
            .collect())
    }

    #[tokio::test]
    async fn test_simple_response() -> Result<()> {
        let provider = MockProvider::new(vec![vec![
            text_chunk("Hello"),
            text_chunk("!"),
            finish_chunk("stop"),
        ]]);
        let agent = agent_with(&provider, 3);

        let events: Vec<ReplyEvent> = agent
            .reply(&[Message::user().with_text("Hi")])
            .try_collect()
            .await?;

        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ReplyEvent::Chunk(_)));
        match &events[3] {
            ReplyEvent::Message(message) => {
                assert_eq!(message.role, Role::Assistant);
                assert_eq!(message.text(), "Hello!");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let seen = provider.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][0].role, Role::System);
        assert_eq!(seen[0][0].text(), "sys");
        assert_eq!(seen[0][1].text(), "Hi");
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_results_follow_request_order() -> Result<()> {
        let provider = MockProvider::new(vec![
            vec![
                tool_call_chunk(0, "a", "echo", r#"{"message": "first", "delay": 50}"#),
                tool_call_chunk(1, "b", "echo", r#"{"message": "second"}"#),
                tool_call_chunk(2, "c", "fail", "{}"),
                finish_chunk("tool_calls"),
            ],
            vec![text_chunk("All done!"), finish_chunk("stop")],
        ]);
        let agent = agent_with(&provider, 3);

        let messages = messages_of(&agent, &[Message::user().with_text("Go")]).await?;

        // assistant request, three results, final answer
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].tool_requests().len(), 3);

        let ids: Vec<&str> = messages[1..4]
            .iter()
            .map(|m| m.content[0].as_tool_response().unwrap().id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let first = messages[1].content[0].as_tool_response().unwrap();
        assert_eq!(first.name, "echo");
        assert_eq!(
            first.tool_result,
            Ok(vec![Content::text("\"first\"")])
        );
        let failed = messages[3].content[0].as_tool_response().unwrap();
        assert_eq!(
            failed.tool_result,
            Err(AgentError::ExecutionError("nope".to_string()))
        );
        assert_eq!(messages[4].content[0], MessageContent::text("All done!"));

        // second model call sees system, user, assistant and the three results
        let seen = provider.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].len(), 6);
        assert_eq!(seen[1][5].role, Role::Tool);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool_is_isolated() -> Result<()> {
        let provider = MockProvider::new(vec![
            vec![
                tool_call_chunk(0, "1", "invalid_tool", "{}"),
                tool_call_chunk(1, "2", "echo", r#"{"message": "ok"}"#),
            ],
            vec![text_chunk("Error occurred")],
        ]);
        let agent = agent_with(&provider, 3);

        let messages = messages_of(&agent, &[Message::user().with_text("Invalid tool")]).await?;

        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[1].content[0].as_tool_response().unwrap().tool_result,
            Err(AgentError::ToolNotFound("invalid_tool".to_string()))
        );
        assert!(messages[2].content[0]
            .as_tool_response()
            .unwrap()
            .tool_result
            .is_ok());
        assert_eq!(messages[3].text(), "Error occurred");
        Ok(())
    }

    #[tokio::test]
    async fn test_max_tool_rounds_exceeded() -> Result<()> {
        let turn = || vec![tool_call_chunk(0, "x", "echo", r#"{"message": "again"}"#)];
        let provider = MockProvider::new(vec![turn(), turn(), turn()]);
        let agent = agent_with(&provider, 2);

        let result: Result<Vec<ReplyEvent>> = agent
            .reply(&[Message::user().with_text("loop")])
            .try_collect()
            .await;

        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<AgentError>(),
            Some(&AgentError::MaxToolRoundsExceeded(2))
        );
        assert_eq!(provider.seen().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_rounds_allows_plain_answers() -> Result<()> {
        let provider = MockProvider::new(vec![vec![text_chunk("Just text")]]);
        let agent = agent_with(&provider, 0);

        let messages = messages_of(&agent, &[Message::user().with_text("Hi")]).await?;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "Just text");
        Ok(())
    }
}
