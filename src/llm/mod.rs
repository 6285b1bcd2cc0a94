pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::{
    ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmError, LlmProvider, LlmResult,
    LlmTokenUsage, LlmTokenUsageTotals, ToolCall, ToolDescriptor,
};
