use crate::agent::{Payload, Reply, Role, Turn};
use crate::chart::{Figure, FigureLineKind};
use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use crate::llm::LlmTokenUsageTotals;
use ratatui::text::{Line, Span};

const CHART_INTRO: &str = "Please find chart as requested:";
const CHART_BAR_WIDTH: usize = 40;
const STEP_PADDING: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputKind {
    UserInput,
    AssistantText,
    AssistantWaiting,
    ToolRequest,
    ToolResult,
    SystemInfo,
    SystemError,
}

#[derive(Debug, Clone)]
pub(crate) enum TimelineEntry {
    UserInput(String),
    OutputLine { kind: OutputKind, text: String },
    Chart(Figure),
    ChatTurn(ChatTurn),
}

#[derive(Debug, Clone)]
pub(crate) struct ChatTurn {
    pub(crate) prompt: String,
    pub(crate) events: Vec<StepEvent>,
    pub(crate) state: ChatTurnState,
    pub(crate) token_usage: Option<LlmTokenUsageTotals>,
}

#[derive(Debug, Clone)]
pub(crate) enum ChatTurnState {
    InFlight,
    Completed(Vec<Reply>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub(crate) enum StepEvent {
    ToolRequest { text: String },
    ToolResult { text: String },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the visible conversation from a session history. System
    /// turns are never shown.
    pub(crate) fn from_history(history: &[Turn]) -> Self {
        let mut timeline = Self::new();
        for turn in history {
            match (turn.role(), turn.payload()) {
                (Role::System, _) => {}
                (Role::User, Payload::Text(text)) => timeline.push_user_input(text),
                (_, Payload::Text(text)) => timeline.push_output(OutputKind::AssistantText, text),
                (_, Payload::Figure(figure)) => {
                    timeline.push_output(OutputKind::AssistantText, CHART_INTRO);
                    timeline.entries.push(TimelineEntry::Chart(figure.clone()));
                }
            }
        }
        timeline
    }

    pub(crate) fn push_output(&mut self, kind: OutputKind, text: &str) {
        for line in split_output_lines(text) {
            self.entries.push(TimelineEntry::OutputLine {
                kind,
                text: line.to_string(),
            });
        }
    }

    pub(crate) fn push_user_input(&mut self, text: &str) {
        for line in split_output_lines(text) {
            self.entries.push(TimelineEntry::UserInput(line.to_string()));
        }
    }

    pub(crate) fn push_chat_turn(&mut self, prompt: String) -> usize {
        let index = self.entries.len();
        self.entries.push(TimelineEntry::ChatTurn(ChatTurn {
            prompt,
            events: Vec::new(),
            state: ChatTurnState::InFlight,
            token_usage: None,
        }));
        index
    }

    pub(crate) fn chat_turn_mut(&mut self, index: usize) -> Option<&mut ChatTurn> {
        match self.entries.get_mut(index) {
            Some(TimelineEntry::ChatTurn(turn)) => Some(turn),
            _ => None,
        }
    }

    pub(crate) fn render_lines(&self, theme: &Theme, show_steps: bool) -> Vec<Line<'static>> {
        if self.entries.is_empty() {
            return vec![Line::from(Span::styled(
                "Welcome to CareLine. Type /help for commands. Ctrl-T toggles tool steps.",
                theme.style(output_token_for(OutputKind::SystemInfo)),
            ))];
        }

        let context = RenderContext { theme, show_steps };
        let mut lines = Vec::new();
        for entry in &self.entries {
            widget_for_entry(entry).render(&context, &mut lines);
        }

        lines
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

trait TimelineWidget {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>);
}

struct RenderContext<'a> {
    theme: &'a Theme,
    show_steps: bool,
}

struct UserInputWidget<'a> {
    text: &'a str,
}

impl TimelineWidget for UserInputWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        lines.push(prompt_line(context, self.text));
    }
}

struct OutputLineWidget<'a> {
    kind: OutputKind,
    text: &'a str,
}

impl TimelineWidget for OutputLineWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        lines.push(Line::from(Span::styled(
            self.text.to_string(),
            context.theme.style(output_token_for(self.kind)),
        )));
    }
}

struct FigureWidget<'a> {
    figure: &'a Figure,
}

impl TimelineWidget for FigureWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        for line in self.figure.render_lines(CHART_BAR_WIDTH) {
            let token = match line.kind {
                FigureLineKind::Title => ThemeToken::ChartTitle,
                FigureLineKind::Axis => ThemeToken::ChartAxis,
                FigureLineKind::Data => ThemeToken::ChartBar,
                FigureLineKind::Empty => ThemeToken::SystemInfo,
            };
            lines.push(Line::from(Span::styled(
                line.text,
                context.theme.style(token),
            )));
        }
    }
}

struct ChatTurnWidget<'a> {
    turn: &'a ChatTurn,
}

impl TimelineWidget for ChatTurnWidget<'_> {
    fn render(&self, context: &RenderContext<'_>, lines: &mut Vec<Line<'static>>) {
        lines.push(prompt_line(context, &self.turn.prompt));

        let in_flight = matches!(self.turn.state, ChatTurnState::InFlight);
        if context.show_steps {
            lines.push(Line::from(""));
            lines.push(thinking_line(context));
            for event in &self.turn.events {
                let (kind, text) = match event {
                    StepEvent::ToolRequest { text } => (OutputKind::ToolRequest, text),
                    StepEvent::ToolResult { text } => (OutputKind::ToolResult, text),
                };
                lines.push(Line::from(Span::styled(
                    format!("{STEP_PADDING}{text}"),
                    context.theme.style(output_token_for(kind)),
                )));
            }
            lines.push(Line::from(""));
        } else if in_flight {
            lines.push(thinking_line(context));
        }

        match &self.turn.state {
            ChatTurnState::InFlight => {}
            ChatTurnState::Completed(replies) => {
                for reply in replies {
                    match reply {
                        Reply::Text(text) => {
                            OutputLineWidget::push_all(context, lines, OutputKind::AssistantText, text)
                        }
                        Reply::Chart(figure) => {
                            OutputLineWidget::push_all(
                                context,
                                lines,
                                OutputKind::AssistantText,
                                CHART_INTRO,
                            );
                            FigureWidget { figure }.render(context, lines);
                        }
                    }
                }
                render_turn_token_total(context, lines, self.turn.token_usage.as_ref());
            }
            ChatTurnState::Failed(message) => {
                OutputLineWidget::push_all(context, lines, OutputKind::SystemError, message);
                render_turn_token_total(context, lines, self.turn.token_usage.as_ref());
            }
        }
    }
}

impl OutputLineWidget<'_> {
    fn push_all(
        context: &RenderContext<'_>,
        lines: &mut Vec<Line<'static>>,
        kind: OutputKind,
        text: &str,
    ) {
        for line in split_output_lines(text) {
            OutputLineWidget { kind, text: line }.render(context, lines);
        }
    }
}

fn prompt_line(context: &RenderContext<'_>, text: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("you> ", context.theme.style(ThemeToken::UserPrompt)),
        Span::styled(
            text.to_string(),
            context.theme.style(output_token_for(OutputKind::UserInput)),
        ),
    ])
}

fn thinking_line(context: &RenderContext<'_>) -> Line<'static> {
    Line::from(vec![
        Span::raw(STEP_PADDING),
        Span::styled(
            "Thinking...",
            context
                .theme
                .style(output_token_for(OutputKind::AssistantWaiting)),
        ),
    ])
}

fn render_turn_token_total(
    context: &RenderContext<'_>,
    lines: &mut Vec<Line<'static>>,
    usage: Option<&LlmTokenUsageTotals>,
) {
    let Some(usage) = usage else {
        return;
    };
    if usage.is_zero() {
        return;
    }

    let total_text = if usage.total_tokens == 0 {
        "?".to_string()
    } else {
        usage.total_tokens.to_string()
    };
    lines.push(Line::from(Span::styled(
        format!("  Tokens (turn): {total_text}"),
        context
            .theme
            .style(output_token_for(OutputKind::SystemInfo)),
    )));
}

fn widget_for_entry(entry: &TimelineEntry) -> Box<dyn TimelineWidget + '_> {
    match entry {
        TimelineEntry::UserInput(text) => Box::new(UserInputWidget { text }),
        TimelineEntry::OutputLine { kind, text } => {
            Box::new(OutputLineWidget { kind: *kind, text })
        }
        TimelineEntry::Chart(figure) => Box::new(FigureWidget { figure }),
        TimelineEntry::ChatTurn(turn) => Box::new(ChatTurnWidget { turn }),
    }
}

fn split_output_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }

    text.lines().collect()
}

fn output_token_for(kind: OutputKind) -> ThemeToken {
    match kind {
        OutputKind::UserInput => ThemeToken::UserInput,
        OutputKind::AssistantText => ThemeToken::AssistantText,
        OutputKind::AssistantWaiting => ThemeToken::AssistantWaiting,
        OutputKind::ToolRequest => ThemeToken::ToolRequest,
        OutputKind::ToolResult => ThemeToken::ToolResult,
        OutputKind::SystemInfo => ThemeToken::SystemInfo,
        OutputKind::SystemError => ThemeToken::SystemError,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        ChatTurnState, OutputKind, StepEvent, Timeline, output_token_for, split_output_lines,
    };
    use crate::agent::{ChatSession, Reply};
    use crate::cases::CaseTable;
    use crate::chart::{ChartKind, DataPoint, Figure};
    use crate::cli::theme::Theme;
    use crate::config::ThemeToken;
    use crate::llm::LlmTokenUsageTotals;

    fn text_lines(lines: Vec<ratatui::text::Line<'static>>) -> Vec<String> {
        lines.into_iter().map(|line| line.to_string()).collect()
    }

    fn figure() -> Figure {
        Figure {
            kind: ChartKind::Bar,
            title: "Cases by channel".to_string(),
            x_label: "Channel".to_string(),
            y_label: "Number of cases".to_string(),
            points: vec![
                DataPoint {
                    label: "Hotline".to_string(),
                    value: 2.0,
                },
                DataPoint {
                    label: "Email".to_string(),
                    value: 1.0,
                },
            ],
        }
    }

    fn completed_turn_fixture() -> Timeline {
        let mut timeline = Timeline::new();
        let idx = timeline.push_chat_turn("chart by channel".to_string());
        let turn = timeline.chat_turn_mut(idx).expect("chat turn index");
        turn.events = vec![
            StepEvent::ToolRequest {
                text: "-> chart_generator: by channel".to_string(),
            },
            StepEvent::ToolResult {
                text: "<- chart_generator: bar chart, 2 point(s)".to_string(),
            },
        ];
        turn.state = ChatTurnState::Completed(vec![Reply::Chart(figure())]);
        turn.token_usage = Some(LlmTokenUsageTotals {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        });
        timeline
    }

    #[test]
    fn split_lines_works() {
        assert_eq!(split_output_lines("a\nb\n"), vec!["a", "b"]);
        assert!(split_output_lines("").is_empty());
    }

    #[test]
    fn output_kind_maps_to_theme_tokens() {
        assert_eq!(
            output_token_for(OutputKind::ToolRequest),
            ThemeToken::ToolRequest
        );
        assert_eq!(
            output_token_for(OutputKind::SystemError),
            ThemeToken::SystemError
        );
    }

    #[test]
    fn empty_timeline_renders_welcome_message() {
        let lines = text_lines(Timeline::new().render_lines(&Theme::new(false), true));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Welcome to CareLine."));
    }

    #[test]
    fn history_rendering_skips_system_turn() {
        let table = CaseTable::new(vec!["CaseNumber".to_string()], Vec::new()).expect("table");
        let mut session = ChatSession::new("t", Arc::new(table));
        session.push_user("chart please");
        session.push_reply(Reply::Chart(figure()));

        let lines = text_lines(
            Timeline::from_history(session.history()).render_lines(&Theme::new(false), false),
        );
        assert_eq!(lines[0], "Hello! How can I help you?");
        assert_eq!(lines[1], "you> chart please");
        assert_eq!(lines[2], "Please find chart as requested:");
        assert_eq!(lines[3], "Cases by channel");
        assert!(!lines.iter().any(|line| line.contains("CareLine, a Hotline")));
    }

    #[test]
    fn completed_chart_turn_renders_intro_and_figure() {
        let lines = text_lines(completed_turn_fixture().render_lines(&Theme::new(false), false));
        insta::assert_snapshot!(lines.join("\n"), @r"
        you> chart by channel
        Please find chart as requested:
        Cases by channel
        x: Channel  y: Number of cases
        Hotline │████████████████████████████████████████ 2
        Email   │████████████████████ 1
          Tokens (turn): 15
        ");
    }

    #[test]
    fn steps_toggle_is_retroactive_for_completed_turn() {
        let timeline = completed_turn_fixture();
        let with_steps = text_lines(timeline.render_lines(&Theme::new(false), true));
        let without_steps = text_lines(timeline.render_lines(&Theme::new(false), false));

        assert!(with_steps.iter().any(|line| line == "  Thinking..."));
        assert!(
            with_steps
                .iter()
                .any(|line| line == "  <- chart_generator: bar chart, 2 point(s)")
        );
        assert!(!without_steps.iter().any(|line| line.starts_with("  ->")));
        assert!(!without_steps.iter().any(|line| line == "  Thinking..."));
    }

    #[test]
    fn thinking_block_has_blank_line_padding() {
        let lines = text_lines(completed_turn_fixture().render_lines(&Theme::new(false), true));
        let thinking_idx = lines
            .iter()
            .position(|line| line == "  Thinking...")
            .expect("thinking header");
        let result_idx = lines
            .iter()
            .position(|line| line.starts_with("  <- "))
            .expect("result line");

        assert_eq!(lines[thinking_idx - 1], "");
        assert_eq!(lines[result_idx + 1], "");
    }

    #[test]
    fn inflight_turn_always_shows_thinking() {
        let mut timeline = Timeline::new();
        timeline.push_chat_turn("case 6601?".to_string());

        let lines = text_lines(timeline.render_lines(&Theme::new(false), false));
        assert_eq!(lines, vec!["you> case 6601?", "  Thinking..."]);
    }

    #[test]
    fn failed_turn_renders_error_and_usage() {
        let mut timeline = Timeline::new();
        let idx = timeline.push_chat_turn("chart".to_string());
        let turn = timeline.chat_turn_mut(idx).expect("chat turn index");
        turn.state = ChatTurnState::Failed("Assistant request failed: boom".to_string());
        turn.token_usage = Some(LlmTokenUsageTotals {
            input_tokens: 2,
            output_tokens: 1,
            total_tokens: 3,
        });

        let lines = text_lines(timeline.render_lines(&Theme::new(false), false));
        assert_eq!(
            lines,
            vec![
                "you> chart",
                "Assistant request failed: boom",
                "  Tokens (turn): 3"
            ]
        );
    }

    #[test]
    fn multiline_entries_split_and_preserve_order() {
        let mut timeline = Timeline::new();
        timeline.push_user_input("/case 1");
        timeline.push_output(OutputKind::AssistantText, "CaseNumber: ['1']\nChannel: [nan]");
        let idx = timeline.push_chat_turn("summarize".to_string());
        let turn = timeline.chat_turn_mut(idx).expect("chat turn index");
        turn.state = ChatTurnState::Completed(vec![
            Reply::Text("line one\nline two".to_string()),
            Reply::Text("No case reported".to_string()),
        ]);

        let lines = text_lines(timeline.render_lines(&Theme::new(false), false));
        assert_eq!(
            lines,
            vec![
                "you> /case 1",
                "CaseNumber: ['1']",
                "Channel: [nan]",
                "you> summarize",
                "line one",
                "line two",
                "No case reported",
            ]
        );
    }
}
