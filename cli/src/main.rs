use c3d_cli::commands::{cli, render};
use c3d_cli::http;
use c3d_cli::utils::parse_env_pairs;
use c3d_core::api::{load_from, AppConfig, CliError, GatewayError, LoggingConfig};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let mut args = cli::Args::parse();
    let mut cfg =
        load_from(args.config.as_deref()).map_err(|e| CliError::Config(format!("{e:#}")))?;
    apply_cli_overrides(&mut cfg, &args)?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    let cmd = args
        .command
        .take()
        .unwrap_or_else(|| cli::Commands::Serve(cli::ServeArgs::default()));
    dispatch(cmd, &cfg).await
}

fn apply_cli_overrides(cfg: &mut AppConfig, args: &cli::Args) -> Result<(), CliError> {
    if let Some(interpreter) = args.interpreter.as_deref().map(str::trim) {
        if interpreter.is_empty() {
            return Err(CliError::Config("--interpreter cannot be empty".to_string()));
        }
        cfg.gateway.interpreter = interpreter.to_string();
    }
    for (k, v) in parse_env_pairs(&args.env)? {
        cfg.gateway.env.insert(k, v);
    }
    Ok(())
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 2: script ran but produced no model (render command, returned as exit code)
    // 11: config error
    // 20: spawn / IO error
    // 50: internal/uncategorized
    match e {
        CliError::Config(_) => 11,
        CliError::Gateway(ge) => match ge {
            GatewayError::Validation(_) => 11,
            GatewayError::NotFound(_) => 20,
            GatewayError::Workdir { .. } => 20,
            GatewayError::Spawn(_) => 20,
            GatewayError::StreamIo { .. } => 20,
            GatewayError::Io(_) => 20,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

async fn dispatch(cmd: cli::Commands, cfg: &AppConfig) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Serve(serve_args) => {
            http::handle_serve(serve_args, cfg).await?;
            Ok(0)
        }
        cli::Commands::Render(render_args) => render::handle_render(render_args, cfg).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("c3d-logs"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("c3d.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
