use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::agent::{AgentProgressEvent, ChatSession, Reply, run_turn};
use crate::cases::lookup_case;
use crate::cli::commands::{Command, HELP_TEXT, is_command_line, is_quit_word, parse_command};
use crate::cli::theme::Theme;
use crate::cli::timeline::{ChatTurnState, OutputKind, StepEvent, Timeline};
use crate::config::{ThemeConfig, ThemeToken};
use crate::llm::{LlmProvider, LlmTokenUsageTotals};
use crate::trace::{SessionTrace, TraceKind};

const PROMPT: &str = "you> ";
const PAGE_SCROLL: u16 = 10;
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const CHART_TRACE_WIDTH: usize = 40;

/// Everything the chat UI needs from startup.
pub struct AppState<P> {
    pub session: ChatSession,
    pub llm: Option<P>,
    /// Shown instead of an answer when `llm` is `None`.
    pub llm_unavailable_reason: String,
    pub model_label: Option<String>,
    pub theme_config: ThemeConfig,
    pub color_enabled: bool,
    pub startup_message: Option<String>,
    pub trace: SessionTrace,
}

struct PendingTurn {
    index: usize,
    prompt: String,
}

/// The chat screen: timeline, input line and status line.
pub struct ChatApp<P> {
    state: AppState<P>,
    theme: Theme,
    timeline: Timeline,
    input: String,
    cursor: usize,
    input_history: Vec<String>,
    history_index: Option<usize>,
    history_draft: String,
    show_steps: bool,
    scroll_from_bottom: u16,
    pending: Option<PendingTurn>,
    session_usage: LlmTokenUsageTotals,
    should_quit: bool,
}

impl<P: LlmProvider> ChatApp<P> {
    pub fn new(state: AppState<P>) -> Self {
        let theme = Theme::from_config(state.color_enabled, &state.theme_config);
        let mut timeline = Timeline::from_history(state.session.history());
        if let Some(message) = &state.startup_message {
            timeline.push_output(OutputKind::SystemInfo, message);
        }
        if state.llm.is_none() {
            timeline.push_output(
                OutputKind::SystemError,
                &format!("Assistant unavailable: {}", state.llm_unavailable_reason),
            );
        }
        state.trace.record(
            TraceKind::System,
            &format!("session {} started", state.session.id()),
        );

        Self {
            state,
            theme,
            timeline,
            input: String::new(),
            cursor: 0,
            input_history: Vec::new(),
            history_index: None,
            history_draft: String::new(),
            show_steps: false,
            scroll_from_bottom: 0,
            pending: None,
            session_usage: LlmTokenUsageTotals::default(),
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn show_steps(&self) -> bool {
        self.show_steps
    }

    pub fn session(&self) -> &ChatSession {
        &self.state.session
    }

    pub fn has_pending_turn(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => self.should_quit = true,
            KeyCode::Char('t') if ctrl => self.show_steps = !self.show_steps,
            // Input is blocked while a turn is running.
            _ if self.pending.is_some() => {}
            KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert_char(ch)
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_char_at_cursor();
                }
            }
            KeyCode::Delete => self.remove_char_at_cursor(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.input_len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input_len(),
            KeyCode::Up => self.history_previous(),
            KeyCode::Down => self.history_next(),
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(PAGE_SCROLL)
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(PAGE_SCROLL)
            }
            _ => {}
        }
    }

    /// Sends the queued question to the assistant and records the outcome.
    pub async fn run_pending_turn(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(provider) = self.state.llm.as_ref() else {
            return;
        };

        let mut events = Vec::new();
        let result = run_turn(
            provider,
            &mut self.state.session,
            &pending.prompt,
            &mut |event| events.push(event),
        )
        .await;

        let steps = events
            .iter()
            .filter_map(|event| record_event(&self.state.trace, event))
            .collect::<Vec<_>>();

        let (state, usage) = match result {
            Ok(outcome) => {
                for reply in &outcome.replies {
                    match reply {
                        Reply::Text(text) => {
                            self.state.trace.record(TraceKind::AssistantText, text)
                        }
                        Reply::Chart(figure) => self
                            .state
                            .trace
                            .record(TraceKind::Chart, &figure.to_text(CHART_TRACE_WIDTH)),
                    }
                }
                self.session_usage.merge(&outcome.usage);
                (ChatTurnState::Completed(outcome.replies), Some(outcome.usage))
            }
            Err(err) => {
                let message = format!("Assistant request failed: {err}");
                self.state.trace.record(TraceKind::Error, &message);
                (ChatTurnState::Failed(message), None)
            }
        };

        if let Some(turn) = self.timeline.chat_turn_mut(pending.index) {
            turn.events = steps;
            turn.state = state;
            turn.token_usage = usage;
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let [timeline_area, input_area, status_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.draw_timeline(frame, timeline_area);
        self.draw_input(frame, input_area);
        self.draw_status(frame, status_area);
    }

    fn draw_timeline(&self, frame: &mut Frame, area: Rect) {
        let lines = self.timeline.render_lines(&self.theme, self.show_steps);
        let width = usize::from(area.width.max(1));
        let rows = lines
            .iter()
            .map(|line| line.width().div_ceil(width).max(1))
            .sum::<usize>();
        let max_offset = rows.saturating_sub(usize::from(area.height));
        let offset = max_offset.saturating_sub(usize::from(self.scroll_from_bottom));
        let offset = u16::try_from(offset).unwrap_or(u16::MAX);

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let line = if self.pending.is_some() {
            Line::from(Span::styled(
                "waiting for the assistant...",
                self.theme.style(ThemeToken::AssistantWaiting),
            ))
        } else {
            Line::from(vec![
                Span::styled(PROMPT, self.theme.style(ThemeToken::UserPrompt)),
                Span::styled(self.input.clone(), self.theme.style(ThemeToken::InputBlock)),
            ])
        };
        frame.render_widget(
            Paragraph::new(line).style(self.theme.style(ThemeToken::InputBlock)),
            area,
        );

        if self.pending.is_none() {
            let offset = self.cursor_column();
            let x = area
                .x
                .saturating_add(u16::try_from(offset).unwrap_or(u16::MAX))
                .min(area.right().saturating_sub(1));
            frame.set_cursor_position((x, area.y));
        }
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Paragraph::new(self.status_text()).style(self.theme.style(ThemeToken::Status)),
            area,
        );
    }

    fn status_text(&self) -> String {
        let assistant = match (&self.state.llm, &self.state.model_label) {
            (None, _) => "assistant unavailable".to_string(),
            (Some(_), Some(model)) => format!("model: {model}"),
            (Some(_), None) => "assistant ready".to_string(),
        };
        let steps = if self.show_steps { "on" } else { "off" };
        format!(
            " CareLine | {assistant} | cases: {} | steps: {steps} | tokens: {}",
            self.state.session.table().len(),
            self.session_usage.total_tokens
        )
    }

    fn submit(&mut self) {
        let line = self.input.trim().to_string();
        self.input.clear();
        self.cursor = 0;
        self.history_index = None;
        self.history_draft.clear();
        if line.is_empty() {
            return;
        }

        if self.input_history.last() != Some(&line) {
            self.input_history.push(line.clone());
        }
        self.scroll_from_bottom = 0;
        self.state.trace.record(TraceKind::UserInput, &line);

        if is_quit_word(&line) {
            self.should_quit = true;
        } else if is_command_line(&line) {
            self.handle_command(&line);
        } else {
            self.submit_question(line);
        }
    }

    fn handle_command(&mut self, line: &str) {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(err) => {
                self.timeline.push_user_input(line);
                self.timeline
                    .push_output(OutputKind::SystemError, &err.to_string());
                return;
            }
        };

        match command {
            Command::Clear => {
                self.timeline.clear();
                return;
            }
            Command::Reset => {
                self.state.session.reset();
                self.timeline = Timeline::from_history(self.state.session.history());
                self.timeline
                    .push_output(OutputKind::SystemInfo, "Started a new conversation.");
                self.state.trace.record(TraceKind::System, "conversation reset");
                return;
            }
            Command::Quit => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        self.timeline.push_user_input(line);
        match command {
            Command::Help => self.timeline.push_output(OutputKind::SystemInfo, HELP_TEXT),
            Command::Case { number } => {
                let info = lookup_case(self.state.session.table(), &number);
                self.state.trace.record(TraceKind::System, &info);
                self.timeline.push_output(OutputKind::AssistantText, &info);
            }
            Command::Schema => {
                let schema = self.state.session.schema().to_string();
                self.timeline.push_output(OutputKind::SystemInfo, &schema);
            }
            Command::Steps(requested) => {
                if let Some(enabled) = requested {
                    self.show_steps = enabled;
                }
                let state = if self.show_steps { "on" } else { "off" };
                self.timeline
                    .push_output(OutputKind::SystemInfo, &format!("Tool steps: {state}"));
            }
            Command::Trace => {
                let path = self.state.trace.file_path().display().to_string();
                self.timeline
                    .push_output(OutputKind::SystemInfo, &format!("Trace file: {path}"));
            }
            Command::Clear | Command::Reset | Command::Quit => {}
        }
    }

    fn submit_question(&mut self, line: String) {
        if self.state.llm.is_none() {
            let message = format!("Assistant unavailable: {}", self.state.llm_unavailable_reason);
            self.state.trace.record(TraceKind::Error, &message);
            self.timeline.push_user_input(&line);
            self.timeline.push_output(OutputKind::SystemError, &message);
            return;
        }

        let index = self.timeline.push_chat_turn(line.clone());
        self.pending = Some(PendingTurn {
            index,
            prompt: line,
        });
    }

    fn input_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(offset, _)| offset)
    }

    /// Terminal column of the cursor in the input row, counting wide
    /// characters as two cells.
    fn cursor_column(&self) -> usize {
        let before = &self.input[..self.byte_offset(self.cursor)];
        Span::raw(PROMPT).width() + Span::raw(before).width()
    }

    fn insert_char(&mut self, ch: char) {
        let offset = self.byte_offset(self.cursor);
        self.input.insert(offset, ch);
        self.cursor += 1;
    }

    fn remove_char_at_cursor(&mut self) {
        if self.cursor < self.input_len() {
            let offset = self.byte_offset(self.cursor);
            self.input.remove(offset);
        }
    }

    fn history_previous(&mut self) {
        if self.input_history.is_empty() {
            return;
        }
        let index = match self.history_index {
            None => {
                self.history_draft = self.input.clone();
                self.input_history.len() - 1
            }
            Some(index) => index.saturating_sub(1),
        };
        self.history_index = Some(index);
        self.set_input(self.input_history[index].clone());
    }

    fn history_next(&mut self) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < self.input_history.len() {
            self.history_index = Some(index + 1);
            self.set_input(self.input_history[index + 1].clone());
        } else {
            self.history_index = None;
            let draft = std::mem::take(&mut self.history_draft);
            self.set_input(draft);
        }
    }

    fn set_input(&mut self, text: String) {
        self.input = text;
        self.cursor = self.input_len();
    }
}

fn record_event(trace: &SessionTrace, event: &AgentProgressEvent) -> Option<StepEvent> {
    match event {
        AgentProgressEvent::ModelResponse {
            tool_calls,
            has_text,
        } => {
            trace.record(
                TraceKind::ToolStep,
                &format!("model response: {tool_calls} tool call(s), text: {has_text}"),
            );
            None
        }
        AgentProgressEvent::ToolRequest { name, arguments } => {
            let text = format!("-> {name} {arguments}");
            trace.record(TraceKind::ToolStep, &text);
            Some(StepEvent::ToolRequest { text })
        }
        AgentProgressEvent::ToolResult { name, summary } => {
            let text = format!("<- {name}: {summary}");
            trace.record(TraceKind::ToolStep, &text);
            Some(StepEvent::ToolResult { text })
        }
    }
}

/// Runs the full-screen chat until the operator quits.
pub async fn run_repl<P: LlmProvider>(state: AppState<P>) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, ChatApp::new(state)).await;
    ratatui::restore();
    result
}

async fn event_loop<B: Backend, P: LlmProvider>(
    terminal: &mut Terminal<B>,
    mut app: ChatApp<P>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.draw(frame))?;
        if app.should_quit() {
            return Ok(());
        }

        if app.has_pending_turn() {
            app.run_pending_turn().await;
            continue;
        }

        if event::poll(EVENT_POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
    }
}
