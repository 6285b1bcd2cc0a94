use crate::config::{
    HexColor, StyleOverride, ThemeConfig as UserThemeConfig, ThemeModifier, ThemePreset, ThemeToken,
};
use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Theme {
    enabled: bool,
    styles: HashMap<ThemeToken, Style>,
}

impl Theme {
    #[cfg(test)]
    pub fn new(enabled: bool) -> Self {
        Self::from_config(enabled, &UserThemeConfig::default())
    }

    pub fn from_config(enabled: bool, config: &UserThemeConfig) -> Self {
        let mut styles = preset_styles(config.preset);
        for (token, override_style) in &config.styles {
            let base = styles.get(token).copied().unwrap_or_default();
            styles.insert(*token, merge_style(base, override_style));
        }

        Self { enabled, styles }
    }

    pub fn style(&self, token: ThemeToken) -> Style {
        if !self.enabled {
            return disabled_style(token);
        }

        self.styles.get(&token).copied().unwrap_or_default()
    }
}

/// Colors a preset is built from. Every token draws on one of these.
struct Palette {
    accent: Color,
    text: Color,
    waiting: Color,
    muted: Color,
    error: Color,
    chart_title: Color,
    chart_axis: Color,
    chart_bar: Color,
    input_bg: Color,
    input_fg: Color,
    waiting_modifier: Modifier,
}

const DEFAULT_PALETTE: Palette = Palette {
    accent: Color::Rgb(122, 162, 247),
    text: Color::Rgb(192, 202, 245),
    waiting: Color::Rgb(224, 175, 104),
    muted: Color::Rgb(86, 95, 137),
    error: Color::Rgb(247, 118, 142),
    chart_title: Color::Rgb(187, 154, 247),
    chart_axis: Color::Rgb(86, 95, 137),
    chart_bar: Color::Rgb(158, 206, 106),
    input_bg: Color::Rgb(22, 22, 30),
    input_fg: Color::White,
    waiting_modifier: Modifier::BOLD,
};

const LIGHT_PALETTE: Palette = Palette {
    accent: Color::Rgb(31, 111, 235),
    text: Color::Rgb(36, 41, 47),
    waiting: Color::Rgb(130, 70, 0),
    muted: Color::Rgb(80, 90, 110),
    error: Color::Rgb(176, 0, 32),
    chart_title: Color::Rgb(130, 80, 223),
    chart_axis: Color::Rgb(87, 96, 106),
    chart_bar: Color::Rgb(5, 80, 40),
    input_bg: Color::Rgb(246, 248, 250),
    input_fg: Color::Rgb(36, 41, 47),
    waiting_modifier: Modifier::BOLD,
};

const HIGH_CONTRAST_PALETTE: Palette = Palette {
    accent: Color::Rgb(0, 255, 255),
    text: Color::Rgb(255, 255, 255),
    waiting: Color::Rgb(255, 255, 0),
    muted: Color::Rgb(220, 220, 220),
    error: Color::Rgb(255, 64, 64),
    chart_title: Color::Rgb(255, 215, 0),
    chart_axis: Color::Rgb(173, 216, 230),
    chart_bar: Color::Rgb(0, 255, 127),
    input_bg: Color::Rgb(0, 0, 0),
    input_fg: Color::Rgb(255, 255, 255),
    waiting_modifier: Modifier::BOLD.union(Modifier::UNDERLINED),
};

fn palette(preset: ThemePreset) -> &'static Palette {
    match preset {
        ThemePreset::Default => &DEFAULT_PALETTE,
        ThemePreset::Light => &LIGHT_PALETTE,
        ThemePreset::HighContrast => &HIGH_CONTRAST_PALETTE,
    }
}

fn preset_styles(preset: ThemePreset) -> HashMap<ThemeToken, Style> {
    let palette = palette(preset);
    ThemeToken::all()
        .iter()
        .map(|token| (*token, token_style(palette, *token)))
        .collect()
}

fn token_style(palette: &Palette, token: ThemeToken) -> Style {
    let fg = |color: Color| Style::default().fg(color);
    match token {
        ThemeToken::UserPrompt => fg(palette.accent).add_modifier(Modifier::BOLD),
        ThemeToken::UserInput => fg(palette.input_fg),
        ThemeToken::AssistantText => fg(palette.text),
        ThemeToken::AssistantWaiting => fg(palette.waiting).add_modifier(palette.waiting_modifier),
        ThemeToken::ToolRequest => fg(palette.muted).add_modifier(Modifier::ITALIC),
        ThemeToken::ToolResult | ThemeToken::SystemInfo | ThemeToken::Status => fg(palette.muted),
        ThemeToken::ChartTitle => fg(palette.chart_title).add_modifier(Modifier::BOLD),
        ThemeToken::ChartAxis => fg(palette.chart_axis),
        ThemeToken::ChartBar => fg(palette.chart_bar),
        ThemeToken::SystemError => fg(palette.error).add_modifier(Modifier::BOLD),
        ThemeToken::InputBlock => fg(palette.input_fg).bg(palette.input_bg),
    }
}

/// With colors off only the prompt and chart titles stay bold.
fn disabled_style(token: ThemeToken) -> Style {
    match token {
        ThemeToken::UserPrompt | ThemeToken::ChartTitle => {
            Style::default().add_modifier(Modifier::BOLD)
        }
        _ => Style::default(),
    }
}

/// Colors in an override patch the preset; a modifier list replaces the
/// preset's modifiers outright.
fn merge_style(base: Style, override_style: &StyleOverride) -> Style {
    let colors = Style {
        fg: override_style.fg.map(color_from_hex),
        bg: override_style.bg.map(color_from_hex),
        ..Style::default()
    };
    let patched = base.patch(colors);
    match &override_style.modifiers {
        Some(modifiers) => patched
            .remove_modifier(Modifier::all())
            .add_modifier(modifiers_to_modifier(modifiers)),
        None => patched,
    }
}

fn color_from_hex(color: HexColor) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn modifiers_to_modifier(modifiers: &[ThemeModifier]) -> Modifier {
    modifiers
        .iter()
        .fold(Modifier::empty(), |acc, modifier| acc | ratatui_modifier(*modifier))
}

fn ratatui_modifier(modifier: ThemeModifier) -> Modifier {
    match modifier {
        ThemeModifier::Bold => Modifier::BOLD,
        ThemeModifier::Dim => Modifier::DIM,
        ThemeModifier::Italic => Modifier::ITALIC,
        ThemeModifier::Underlined => Modifier::UNDERLINED,
        ThemeModifier::Reversed => Modifier::REVERSED,
        ThemeModifier::CrossedOut => Modifier::CROSSED_OUT,
    }
}
