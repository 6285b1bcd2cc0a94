use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Deserialize;
use serde_json::json;

use super::session::{ChatSession, Reply};
use crate::cases::{NO_CASE_REPORTED, lookup_case};
use crate::chart::{ChartError, generate_chart};
use crate::llm::{LlmError, LlmProvider, LlmTokenUsage, ToolCall, ToolDescriptor};

pub const GET_INFO_TOOL: &str = "get_info";
pub const CHART_TOOL: &str = "chart_generator";

#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    Llm(LlmError),
    UnknownTool(String),
    InvalidArguments { tool: String, message: String },
    Chart(ChartError),
}

impl Display for AgentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Llm(err) => write!(f, "{err}"),
            Self::UnknownTool(name) => write!(f, "model requested unknown tool '{name}'"),
            Self::InvalidArguments { tool, message } => {
                write!(f, "invalid arguments for {tool}: {message}")
            }
            Self::Chart(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AgentError {}

impl From<LlmError> for AgentError {
    fn from(err: LlmError) -> Self {
        Self::Llm(err)
    }
}

impl From<ChartError> for AgentError {
    fn from(err: ChartError) -> Self {
        Self::Chart(err)
    }
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: GET_INFO_TOOL.to_string(),
            description: "Get information of the case based on given case number".to_string(),
            parameters_json_schema: json!({
                "type": "object",
                "properties": {
                    "case_number": {
                        "type": "string",
                        "description": "case number of the report"
                    }
                },
                "required": ["case_number"]
            }),
        },
        ToolDescriptor {
            name: CHART_TOOL.to_string(),
            description: "Generate a chart based on user instruction or question".to_string(),
            parameters_json_schema: json!({
                "type": "object",
                "properties": {
                    "user_instruction": {
                        "type": "string",
                        "description": "user instruction on creating chart and visualization"
                    }
                },
                "required": ["user_instruction"]
            }),
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub reply: Reply,
    pub usage: Option<LlmTokenUsage>,
    /// One-line description for the step display and the trace.
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct GetInfoArgs {
    case_number: CaseNumberArg,
}

// Models sometimes send numeric case numbers unquoted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaseNumberArg {
    Text(String),
    Number(serde_json::Number),
}

impl CaseNumberArg {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartArgs {
    user_instruction: String,
}

pub async fn dispatch_call<P: LlmProvider>(
    provider: &P,
    session: &ChatSession,
    call: &ToolCall,
) -> Result<ToolOutput, AgentError> {
    match call.name.as_str() {
        GET_INFO_TOOL => {
            let args: GetInfoArgs = parse_args(call)?;
            let case_number = args.case_number.into_text();
            let info = lookup_case(session.table(), &case_number);
            let summary = if info == NO_CASE_REPORTED {
                format!("case {case_number}: not found")
            } else {
                format!("case {case_number}: found")
            };
            Ok(ToolOutput {
                reply: Reply::Text(info),
                usage: None,
                summary,
            })
        }
        CHART_TOOL => {
            let args: ChartArgs = parse_args(call)?;
            let chart = generate_chart(
                provider,
                session.table(),
                session.schema(),
                &args.user_instruction,
            )
            .await?;
            let summary = format!(
                "{} chart, {} point(s)",
                chart.figure.kind.as_str(),
                chart.figure.points.len()
            );
            Ok(ToolOutput {
                reply: Reply::Chart(chart.figure),
                usage: chart.usage,
                summary,
            })
        }
        other => Err(AgentError::UnknownTool(other.to_string())),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(call: &ToolCall) -> Result<T, AgentError> {
    let raw = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };
    serde_json::from_str(raw).map_err(|err| AgentError::InvalidArguments {
        tool: call.name.clone(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{AgentError, CHART_TOOL, GET_INFO_TOOL, dispatch_call, tool_descriptors};
    use crate::agent::{ChatSession, Reply};
    use crate::cases::CaseTable;
    use crate::llm::{ChatRequest, ChatResponse, LlmError, LlmProvider, LlmResult, ToolCall};

    struct NoModel;

    impl LlmProvider for NoModel {
        async fn complete(&self, _request: ChatRequest) -> LlmResult<ChatResponse> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn session() -> ChatSession {
        let table = CaseTable::new(
            vec!["CaseNumber".to_string(), "Channel".to_string()],
            vec![vec![Some("6601".to_string()), Some("Hotline".to_string())]],
        )
        .expect("table");
        ChatSession::new("s", Arc::new(table))
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: None,
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn descriptors_cover_both_tools_with_required_arguments() {
        let tools = tool_descriptors();
        let names = tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec![GET_INFO_TOOL, CHART_TOOL]);
        assert_eq!(
            tools[0].parameters_json_schema["required"][0],
            serde_json::json!("case_number")
        );
    }

    #[tokio::test]
    async fn get_info_returns_lookup_text() {
        let out = dispatch_call(&NoModel, &session(), &call(GET_INFO_TOOL, r#"{"case_number":"6601"}"#))
            .await
            .expect("lookup");
        assert_eq!(
            out.reply,
            Reply::Text("CaseNumber: ['6601']\nChannel: ['Hotline']".to_string())
        );
        assert_eq!(out.summary, "case 6601: found");
    }

    #[tokio::test]
    async fn get_info_accepts_numeric_case_numbers() {
        let out = dispatch_call(&NoModel, &session(), &call(GET_INFO_TOOL, r#"{"case_number":6601}"#))
            .await
            .expect("lookup");
        assert!(matches!(out.reply, Reply::Text(text) if text.starts_with("CaseNumber")));
    }

    #[tokio::test]
    async fn malformed_arguments_are_reported() {
        let err = dispatch_call(&NoModel, &session(), &call(GET_INFO_TOOL, "{case"))
            .await
            .expect_err("bad json");
        assert!(matches!(err, AgentError::InvalidArguments { ref tool, .. } if tool == GET_INFO_TOOL));

        let err = dispatch_call(&NoModel, &session(), &call(CHART_TOOL, ""))
            .await
            .expect_err("missing field");
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = dispatch_call(&NoModel, &session(), &call("delete_case", "{}"))
            .await
            .expect_err("unknown");
        assert_eq!(err, AgentError::UnknownTool("delete_case".to_string()));
    }
}
