use std::path::PathBuf;

use clap::{Parser, Subcommand};
use liveconfig::DialectSetting;

#[derive(Parser, Debug)]
#[command(
    name = "shadelive",
    author,
    version,
    about = "Live-coding runner for GLSL fragment shaders",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Fragment shader defining `void mainImage(out vec4, in vec2)`.
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Configuration file; defaults to `shadelive.toml` in the user config dir.
    #[arg(long, value_name = "FILE", env = "SHADELIVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start in the small windowed presentation instead of fullscreen.
    #[arg(long)]
    pub small: bool,

    /// Do not reload the shader when the file changes.
    #[arg(long)]
    pub no_watch: bool,

    /// Frames a shader without `iTime` keeps drawing after its last change.
    #[arg(long, value_name = "FRAMES", value_parser = clap::value_parser!(u32).range(1..))]
    pub idle_frames: Option<u32>,

    /// GL flavour: `auto`, `gles`, or `desktop`.
    #[arg(long, value_name = "DIALECT", value_parser = parse_dialect)]
    pub dialect: Option<DialectSetting>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a window and live-reload the shader (the default).
    Run(RunArgs),
    /// Print the shader as the driver sees it, with line numbers.
    Wrap(WrapArgs),
}

#[derive(Parser, Debug)]
pub struct WrapArgs {
    #[arg(value_name = "SHADER")]
    pub shader: PathBuf,

    /// Version line to use: `gles` (default) or `desktop`.
    #[arg(long, value_name = "DIALECT", value_parser = parse_dialect)]
    pub dialect: Option<DialectSetting>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_dialect(value: &str) -> Result<DialectSetting, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("dialect must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "auto" => Ok(DialectSetting::Auto),
        "gles" | "es" | "webgl" => Ok(DialectSetting::Gles),
        "desktop" | "gl" | "core" => Ok(DialectSetting::Desktop),
        other => Err(format!(
            "unknown dialect '{other}' (expected auto, gles, or desktop)"
        )),
    }
}
