#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use careline::agent::ChatSession;
use careline::cases::CaseTable;
use careline::cli::{AppState, ChatApp};
use careline::config::ThemeConfig;
use careline::http::{HttpClient, HttpDebugConfig};
use careline::llm::{LlmProvider, OpenAiProvider};
use careline::trace::SessionTrace;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use serde_json::{Value, json};

pub const HOTLINE_CSV: &str = "\
CallId,Company,CaseNumber,Coverage,ReportDate,ReportTime,Channel,Operator,WhistleblowerType,Identity,IncidentType,AllegedPerson,SubmissionDate
C-1,Acme,6601,In scope,2024-01-05,09:15:00,Hotline,Ploy,Employee,Anonymous,Fraud,J. Doe,2024-01-06
C-2,Acme,6602,In scope,2024-01-20,14:02:00,Email,Nok,Third party,Disclosed,Inappropriate behavior,,2024-01-22
C-3,Globex,6603,Out of scope,2024-02-11,11:45:00,Hotline,Ploy,Employee,Anonymous,Fraud,A. Smith,2024-02-12
C-4,Globex,6604,In scope,2024-03-02,16:30:00,Website,Nok,Employee,Disclosed,Fraud,,2024-03-04
";

pub fn write_hotline_csv(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("hotline_log.csv");
    fs::write(&path, HOTLINE_CSV).expect("write hotline csv");
    path
}

pub fn load_table(dir: &Path) -> Arc<CaseTable> {
    let path = write_hotline_csv(dir);
    Arc::new(CaseTable::load(&path).expect("load hotline csv"))
}

pub fn provider_for(server_uri: &str, trace: &SessionTrace) -> OpenAiProvider {
    let http = HttpClient::new(reqwest::Client::new(), HttpDebugConfig::from_verbose(true))
        .with_trace(trace.clone());
    OpenAiProvider::new(
        http,
        Some("test-key".to_string()),
        Some("careline-test".to_string()),
        Some(format!("{server_uri}/v1")),
    )
    .expect("provider")
}

pub fn chat_app<P: LlmProvider>(
    dir: &Path,
    llm: Option<P>,
    trace: SessionTrace,
) -> ChatApp<P> {
    ChatApp::new(AppState {
        session: ChatSession::new("it", load_table(dir)),
        llm,
        llm_unavailable_reason: "missing CARELINE_API_KEY".to_string(),
        model_label: Some("careline-test".to_string()),
        theme_config: ThemeConfig::default(),
        color_enabled: false,
        startup_message: Some("Loaded 4 case(s)".to_string()),
        trace,
    })
}

pub fn type_line<P: LlmProvider>(app: &mut ChatApp<P>, line: &str) {
    for ch in line.chars() {
        app.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
    }
    app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
}

pub fn screen<P: LlmProvider>(app: &ChatApp<P>, width: u16, height: u16) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
    terminal.draw(|frame| app.draw(frame)).expect("draw");
    let buffer = terminal.backend().buffer();
    buffer
        .content
        .chunks(usize::from(buffer.area.width))
        .map(|row| {
            row.iter()
                .map(|cell| cell.symbol())
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

pub fn completion_text(content: &str, total_tokens: u64) -> Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": total_tokens - 5,
            "completion_tokens": 5,
            "total_tokens": total_tokens
        }
    })
}

pub fn completion_tool_call(name: &str, arguments: &str) -> Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 40, "completion_tokens": 10, "total_tokens": 50}
    })
}
