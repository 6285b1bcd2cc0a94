use super::figure::Figure;
use super::interpret::build_figure;
use super::spec::{ChartError, SPEC_CLOSE_TAG, SPEC_OPEN_TAG, parse_chart_spec};
use crate::cases::CaseTable;
use crate::llm::{ChatMessage, ChatRequest, LlmError, LlmProvider, LlmTokenUsage};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedChart {
    pub figure: Figure,
    pub usage: Option<LlmTokenUsage>,
}

/// System instruction for the chart request. The model answers with a
/// declarative spec only; nothing it returns is ever executed.
pub fn chart_instruction(schema: &str) -> String {
    format!(
        "You are a visualization expert.
Return the answer in exactly this format:

{SPEC_OPEN_TAG}
{{ ...chart spec JSON... }}
{SPEC_CLOSE_TAG}

Do not add explanations, only the tags and the JSON.

The chart is computed from the hotline log table with these columns:
{schema}

The chart spec JSON accepts these fields and nothing else:
- \"kind\": \"bar\", \"line\" or \"pie\" (required)
- \"group_by\": the column whose values become the categories (required)
- \"date_bucket\": \"day\", \"month\" or \"year\" to group a date column by period (optional)
- \"aggregate\": {{\"op\": \"count\"}} to count cases, or {{\"op\": \"count_distinct\", \"column\": \"<column>\"}} (optional, default count)
- \"filters\": list of {{\"column\": \"<column>\", \"equals\": \"<value>\"}} that rows must match (optional)
- \"sort\": \"value_desc\", \"value_asc\" or \"label\" (optional)
- \"limit\": maximum number of categories to show, at least 1 (optional)
- \"title\", \"x_label\", \"y_label\": clear chart title and axis labels (optional)

Rules:
1. Only use column names listed above, spelled exactly.
2. Use \"line\" with a date_bucket for trends over time.
3. Use \"pie\" only for shares of a whole with few categories.
4. Always give a clear title and axis labels."
    )
}

pub async fn generate_chart<P: LlmProvider>(
    provider: &P,
    table: &CaseTable,
    schema: &str,
    user_instruction: &str,
) -> Result<GeneratedChart, ChartError> {
    let request = ChatRequest {
        messages: vec![
            ChatMessage::system(chart_instruction(schema)),
            ChatMessage::user(user_instruction),
        ],
        tools: Vec::new(),
    };

    let response = provider.complete(request).await?;
    let text = response.content.ok_or(LlmError::EmptyResponse)?;
    let spec = parse_chart_spec(&text)?;
    let figure = build_figure(table, &spec)?;

    Ok(GeneratedChart {
        figure,
        usage: response.usage,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::{chart_instruction, generate_chart};
    use crate::cases::CaseTable;
    use crate::chart::{ChartError, ChartKind};
    use crate::llm::{
        ChatRequest, ChatResponse, ChatRole, LlmError, LlmProvider, LlmResult, LlmTokenUsage,
    };

    #[derive(Clone)]
    struct ScriptedProvider {
        replies: Arc<Mutex<VecDeque<LlmResult<ChatResponse>>>>,
        seen: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<LlmResult<ChatResponse>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
            self.seen.lock().expect("seen lock").push(request);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn text_reply(text: &str) -> LlmResult<ChatResponse> {
        Ok(ChatResponse {
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
            usage: Some(LlmTokenUsage {
                input_tokens: 50,
                output_tokens: 20,
                total_tokens: 70,
            }),
        })
    }

    fn table() -> CaseTable {
        CaseTable::new(
            vec!["CaseNumber".to_string(), "Channel".to_string()],
            vec![
                vec![Some("1".to_string()), Some("Hotline".to_string())],
                vec![Some("2".to_string()), Some("Email".to_string())],
                vec![Some("3".to_string()), Some("Hotline".to_string())],
            ],
        )
        .expect("table")
    }

    #[test]
    fn instruction_embeds_schema_and_tags() {
        let text = chart_instruction("Channel: Channel of case reported");
        assert!(text.contains("Channel: Channel of case reported"));
        assert!(text.contains("<chart_spec>"));
        assert!(text.contains("</chart_spec>"));
        assert!(text.contains("\"count_distinct\""));
    }

    #[tokio::test]
    async fn generate_chart_sends_two_messages_without_tools() {
        let provider = ScriptedProvider::new(vec![text_reply(
            "<chart_spec>{\"kind\":\"bar\",\"group_by\":\"Channel\"}</chart_spec>",
        )]);

        let chart = generate_chart(&provider, &table(), "schema", "show counts by channel")
            .await
            .expect("chart");

        assert_eq!(chart.figure.kind, ChartKind::Bar);
        assert_eq!(chart.figure.points[0].label, "Hotline");
        assert_eq!(chart.figure.points[0].value, 2.0);
        assert_eq!(chart.usage.map(|usage| usage.total_tokens), Some(70));

        let seen = provider.seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].tools.is_empty());
        assert_eq!(seen[0].messages.len(), 2);
        assert_eq!(seen[0].messages[0].role, ChatRole::System);
        assert_eq!(seen[0].messages[1].content, "show counts by channel");
    }

    #[tokio::test]
    async fn untagged_reply_is_an_error() {
        let provider = ScriptedProvider::new(vec![text_reply("import matplotlib")]);
        let err = generate_chart(&provider, &table(), "schema", "chart")
            .await
            .expect_err("missing tags");
        assert_eq!(err, ChartError::MissingSpecTags);
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped() {
        let provider = ScriptedProvider::new(vec![Err(LlmError::Transport("down".to_string()))]);
        let err = generate_chart(&provider, &table(), "schema", "chart")
            .await
            .expect_err("provider error");
        assert_eq!(err, ChartError::Llm(LlmError::Transport("down".to_string())));
    }
}
