use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_DATA_FILE: &str = "data/hotline_log.xlsx";

pub const ENV_API_KEY: &str = "CARELINE_API_KEY";
pub const ENV_BASE_URL: &str = "CARELINE_BASE_URL";
pub const ENV_MODEL: &str = "CARELINE_MODEL";
pub const ENV_DATA_FILE: &str = "CARELINE_DATA_FILE";

const CONFIG_DIR_NAME: &str = "careline";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved settings. Precedence: environment, then config file, then the
/// built-in default. CLI flags are applied on top by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub config_path: PathBuf,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub data_file: PathBuf,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub preset: ThemePreset,
    pub styles: HashMap<ThemeToken, StyleOverride>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: ThemePreset::Default,
            styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreset {
    Default,
    Light,
    HighContrast,
}

impl FromStr for ThemePreset {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "light" => Ok(Self::Light),
            "high-contrast" => Ok(Self::HighContrast),
            _ => Err(format!("unknown preset '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    UserPrompt,
    UserInput,
    AssistantText,
    AssistantWaiting,
    ToolRequest,
    ToolResult,
    ChartTitle,
    ChartAxis,
    ChartBar,
    SystemInfo,
    SystemError,
    Status,
    InputBlock,
}

impl ThemeToken {
    pub fn all() -> &'static [ThemeToken] {
        &[
            Self::UserPrompt,
            Self::UserInput,
            Self::AssistantText,
            Self::AssistantWaiting,
            Self::ToolRequest,
            Self::ToolResult,
            Self::ChartTitle,
            Self::ChartAxis,
            Self::ChartBar,
            Self::SystemInfo,
            Self::SystemError,
            Self::Status,
            Self::InputBlock,
        ]
    }

    /// Key used under `[theme.styles]`.
    pub fn name(self) -> &'static str {
        match self {
            Self::UserPrompt => "user_prompt",
            Self::UserInput => "user_input",
            Self::AssistantText => "assistant_text",
            Self::AssistantWaiting => "assistant_waiting",
            Self::ToolRequest => "tool_request",
            Self::ToolResult => "tool_result",
            Self::ChartTitle => "chart_title",
            Self::ChartAxis => "chart_axis",
            Self::ChartBar => "chart_bar",
            Self::SystemInfo => "system_info",
            Self::SystemError => "system_error",
            Self::Status => "status",
            Self::InputBlock => "input_block",
        }
    }
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|token| token.name() == value)
            .ok_or_else(|| format!("unknown token '{value}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOverride {
    pub fg: Option<HexColor>,
    pub bg: Option<HexColor>,
    pub modifiers: Option<Vec<ThemeModifier>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        const EXPECTED: &str = "invalid hex color, expected #RRGGBB";

        let hex = value
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| EXPECTED.to_string())?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| EXPECTED.to_string())
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    Reversed,
    CrossedOut,
}

impl FromStr for ThemeModifier {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "bold" => Ok(Self::Bold),
            "dim" => Ok(Self::Dim),
            "italic" => Ok(Self::Italic),
            "underlined" => Ok(Self::Underlined),
            "reversed" => Ok(Self::Reversed),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    data_file: Option<String>,
    theme: Option<RawThemeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThemeConfig {
    name: Option<String>,
    styles: Option<HashMap<String, RawStyleOverride>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStyleOverride {
    fg: Option<String>,
    bg: Option<String>,
    modifiers: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// An explicit path must exist; the discovered default path may be absent.
    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let (config_path, file_config) = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                (path.to_path_buf(), load_file_config(path)?)
            }
            None => {
                let path = discover_config_path()?;
                let file_config = load_file_config(&path)?;
                (path, file_config)
            }
        };
        let file_config = file_config.unwrap_or_default();

        dotenvy::dotenv().ok();

        let theme = validate_theme(file_config.theme.as_ref(), &config_path)?;
        let file_value = |value: &Option<String>| value.as_deref().and_then(non_empty);

        Ok(Self {
            api_key: env_non_empty(ENV_API_KEY).or(file_value(&file_config.api_key)),
            base_url: env_non_empty(ENV_BASE_URL).or(file_value(&file_config.base_url)),
            model: env_non_empty(ENV_MODEL).or(file_value(&file_config.model)),
            data_file: env_non_empty(ENV_DATA_FILE)
                .or(file_value(&file_config.data_file))
                .map_or_else(|| PathBuf::from(DEFAULT_DATA_FILE), PathBuf::from),
            theme,
            config_path,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let Some(theme) = raw_theme else {
        return Ok(ThemeConfig::default());
    };

    let mut config = ThemeConfig::default();

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name)
            .map_err(|reason| config_error(config_path, "theme.name", &reason))?;
    }

    for (token_name, raw_style) in theme.styles.iter().flatten() {
        let token = ThemeToken::from_str(token_name).map_err(|reason| {
            config_error(config_path, &format!("theme.styles.{token_name}"), &reason)
        })?;

        let fg = parse_color(raw_style.fg.as_deref(), config_path, token_name, "fg")?;
        let bg = parse_color(raw_style.bg.as_deref(), config_path, token_name, "bg")?;
        let modifiers = parse_modifiers(raw_style.modifiers.as_deref(), config_path, token_name)?;

        config
            .styles
            .insert(token, StyleOverride { fg, bg, modifiers });
    }

    Ok(config)
}

fn parse_color(
    value: Option<&str>,
    config_path: &Path,
    token_name: &str,
    field_name: &str,
) -> Result<Option<HexColor>> {
    value
        .map(|value| {
            HexColor::from_str(value).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}.{field_name}"),
                    &reason,
                )
            })
        })
        .transpose()
}

fn parse_modifiers(
    values: Option<&[String]>,
    config_path: &Path,
    token_name: &str,
) -> Result<Option<Vec<ThemeModifier>>> {
    let Some(values) = values else {
        return Ok(None);
    };

    values
        .iter()
        .map(|value| {
            ThemeModifier::from_str(value).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}.modifiers"),
                    &reason,
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}
