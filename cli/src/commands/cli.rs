use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "c3d", version, about = "Render CAD scripts and serve the C3D viewer")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file. Defaults to ~/.c3d/config.toml, then ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Interpreter used to run scripts (overrides `gateway.interpreter`).
    #[arg(long, global = true)]
    pub interpreter: Option<String>,

    /// Extra environment variables for the interpreter (KEY=VALUE).
    /// Can be specified multiple times.
    #[arg(long = "env", action = clap::ArgAction::Append, global = true)]
    pub env: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,

    /// Fixed port. `PORT` in the environment takes precedence; without
    /// either, the first free port from `server.port` upward is used.
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the prebuilt frontend.
    #[arg(long)]
    pub frontend_dir: Option<PathBuf>,

    /// Parent directory for per-request working directories.
    #[arg(long)]
    pub temp_root: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RenderArgs {
    /// Script file to execute.
    pub script: PathBuf,

    #[arg(long)]
    pub output_filename: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP render server (default).
    Serve(ServeArgs),
    /// Execute one script locally and print the outcome.
    Render(RenderArgs),
}
