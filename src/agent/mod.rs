mod orchestrator;
mod prompt;
mod session;
mod tools;

pub use orchestrator::{AgentProgressEvent, TurnOutcome, respond, run_turn};
pub use prompt::{GREETING, SYSTEM_PROMPT};
pub use session::{ChatSession, Payload, Reply, Role, Turn};
pub use tools::{AgentError, CHART_TOOL, GET_INFO_TOOL, ToolOutput, dispatch_call, tool_descriptors};
