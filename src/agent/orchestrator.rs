use super::session::{ChatSession, Reply};
use super::tools::{AgentError, dispatch_call, tool_descriptors};
use crate::llm::{ChatRequest, LlmError, LlmProvider, LlmTokenUsageTotals};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentProgressEvent {
    ModelResponse { tool_calls: usize, has_text: bool },
    ToolRequest { name: String, arguments: String },
    ToolResult { name: String, summary: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub replies: Vec<Reply>,
    pub usage: LlmTokenUsageTotals,
}

/// Sends the session history with both tool descriptors and resolves the
/// model's answer. Every tool call in the response is dispatched in order;
/// text alongside tool calls is ignored.
pub async fn respond<P: LlmProvider, F: FnMut(AgentProgressEvent)>(
    provider: &P,
    session: &ChatSession,
    on_event: &mut F,
) -> Result<TurnOutcome, AgentError> {
    let request = ChatRequest {
        messages: session.outgoing_messages(),
        tools: tool_descriptors(),
    };

    let response = provider.complete(request).await?;
    let mut usage = LlmTokenUsageTotals::default();
    usage.add(response.usage);

    on_event(AgentProgressEvent::ModelResponse {
        tool_calls: response.tool_calls.len(),
        has_text: response.content.is_some(),
    });

    if response.tool_calls.is_empty() {
        let text = response.content.ok_or(LlmError::EmptyResponse)?;
        return Ok(TurnOutcome {
            replies: vec![Reply::Text(text)],
            usage,
        });
    }

    let mut replies = Vec::with_capacity(response.tool_calls.len());
    for call in &response.tool_calls {
        on_event(AgentProgressEvent::ToolRequest {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let output = dispatch_call(provider, session, call).await?;
        usage.add(output.usage);
        on_event(AgentProgressEvent::ToolResult {
            name: call.name.clone(),
            summary: output.summary,
        });
        replies.push(output.reply);
    }

    Ok(TurnOutcome { replies, usage })
}

/// Records the operator's input, answers it, and appends the replies to the
/// history. On failure only the user turn is kept.
pub async fn run_turn<P: LlmProvider, F: FnMut(AgentProgressEvent)>(
    provider: &P,
    session: &mut ChatSession,
    input: &str,
    on_event: &mut F,
) -> Result<TurnOutcome, AgentError> {
    session.push_user(input);
    let outcome = respond(provider, session, on_event).await?;
    for reply in &outcome.replies {
        session.push_reply(reply.clone());
    }
    Ok(outcome)
}
