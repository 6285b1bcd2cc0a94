pub mod agent;
pub mod cases;
pub mod chart;
pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod trace;

use agent::ChatSession;
use anyhow::{Result, anyhow};
use cases::CaseTable;
use cli::{AppState, CliArgs, run_repl};
use config::AppConfig;
use http::{HttpClient, HttpDebugConfig};
use llm::{LlmError, OpenAiProvider};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use trace::{SessionTrace, TraceKind};

pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = if let Some(path) = args.config.as_deref() {
        AppConfig::load_with_path(Some(path))?
    } else {
        AppConfig::load()?
    };
    if let Some(data) = args.data {
        config.data_file = data;
    }

    let table = load_case_table(&config.data_file)?;
    let startup_message = format!(
        "Loaded {} case(s) from {}",
        table.len(),
        config.data_file.display()
    );

    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    trace.record(TraceKind::System, &startup_message);

    let http = HttpClient::new(
        reqwest::Client::new(),
        HttpDebugConfig::from_verbose(args.verbose),
    )
    .with_trace(trace.clone());
    let (llm, llm_unavailable_reason) = match OpenAiProvider::new(
        http,
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
    ) {
        Ok(provider) => (Some(provider), String::new()),
        Err(err) => {
            let reason = unavailable_reason(&err);
            trace.record(TraceKind::System, &format!("assistant unavailable: {reason}"));
            (None, reason)
        }
    };
    let model_label = llm.as_ref().map(|provider| provider.model().to_string());

    let state = AppState {
        session: ChatSession::new(session_id, Arc::new(table)),
        llm,
        llm_unavailable_reason,
        model_label,
        theme_config: config.theme.clone(),
        color_enabled: std::env::var_os("NO_COLOR").is_none(),
        startup_message: Some(startup_message),
        trace,
    };

    run_repl(state).await
}

fn load_case_table(path: &Path) -> Result<CaseTable> {
    CaseTable::load(path)
        .map_err(|err| anyhow!("Failed to load data file {}: {err}", path.display()))
}

fn unavailable_reason(err: &LlmError) -> String {
    format!("{err}. Set it in your shell, a .env file or the config file.")
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
