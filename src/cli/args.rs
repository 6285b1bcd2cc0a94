use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "careline")]
#[command(
    about = "Hotline operator assistant: case lookup and charts over the hotline log",
    long_about = "Hotline operator assistant: case lookup and charts over the hotline log\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/careline/config.toml\n    2. ~/.config/careline/config.toml\n\nEnvironment: CARELINE_API_KEY, CARELINE_BASE_URL, CARELINE_MODEL, CARELINE_DATA_FILE"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hotline log spreadsheet to load (.xlsx, .xls, .ods or .csv).
    #[arg(long, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Write redacted HTTP request/response lines to the session trace.
    #[arg(long)]
    pub verbose: bool,
}
