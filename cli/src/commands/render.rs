use c3d_core::api::{AppConfig, CliError, ExecutionOutcome, ExecutionRequest, RetentionPolicy};

use super::cli::{OutputFormat, RenderArgs};

/// Exit code for a script that ran but did not produce a model.
pub const EXIT_SCRIPT_OUTCOME: i32 = 2;

/// Handle `c3d render <script>`.
///
/// Artifacts are always retained so the printed paths stay valid; a running
/// server's retention sweeper removes them once they expire.
pub async fn handle_render(args: RenderArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let script = tokio::fs::read_to_string(&args.script)
        .await
        .map_err(|e| CliError::Command(format!("read {} failed: {e}", args.script.display())))?;

    let mut cfg = cfg.clone();
    cfg.gateway.retention = RetentionPolicy::Retain;
    let gateway = c3d_plugins::factory::build_gateway(&cfg);

    let mut req = ExecutionRequest::new(script);
    req.output_filename = args.output_filename;
    req.timeout_secs = args.timeout_secs;

    let outcome = gateway.execute(req).await?;
    let code = if outcome.is_success() {
        0
    } else {
        EXIT_SCRIPT_OUTCOME
    };

    match args.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&outcome)
                .map_err(|e| CliError::Command(format!("serialize outcome failed: {e}")))?
        ),
        OutputFormat::Text => print_text(&outcome),
    }
    Ok(code)
}

fn print_text(outcome: &ExecutionOutcome) {
    if !outcome.stdout().is_empty() {
        print!("{}", outcome.stdout());
    }
    if !outcome.stderr().is_empty() {
        eprint!("{}", outcome.stderr());
    }
    match outcome {
        ExecutionOutcome::Success(result) => {
            println!("Generated {} file(s):", result.output_paths.len());
            for path in &result.output_paths {
                println!("  {}", path.display());
            }
        }
        ExecutionOutcome::ScriptFailed { exit_code, .. } => match exit_code {
            Some(code) => eprintln!("Script failed with exit code {code}"),
            None => eprintln!("Script was terminated by a signal"),
        },
        ExecutionOutcome::Timeout { timeout_secs, .. } => {
            eprintln!("Script execution timed out after {timeout_secs}s")
        }
        ExecutionOutcome::NoOutputProduced { .. } => {
            eprintln!("Script ran but produced no recognized output files")
        }
    }
}
