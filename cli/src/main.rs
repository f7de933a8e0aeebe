use clap::Parser;
mod commands;
use commands::cli;
use countdown_core::config::{self, AppConfig, LoggingConfig};
use countdown_core::error::CliError;
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
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = load_config(args.config.as_deref())?;
    init_tracing(&cfg.logging).map_err(CliError::Config)?;

    tracing::debug!(
        output = %cfg.executor.output,
        max_parallel = ?cfg.executor.max_parallel,
        "config loaded"
    );

    dispatch(args.command, &cfg).await
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, CliError> {
    let loaded = match path {
        Some(p) => config::load_from_path(p),
        None => config::load_default(),
    };
    loaded.map_err(|e| CliError::Config(format!("{e:#}")))
}

async fn dispatch(cmd: cli::Commands, cfg: &AppConfig) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Plan(plan_args) => commands::plan::run(&plan_args),
        cli::Commands::Validate => commands::validate::run(cfg),
        cli::Commands::Simulate(sim_args) => commands::simulate::run(&sim_args, cfg).await,
    }
}

/// Directory for log files: `logging.directory`, else `$TMPDIR/countdown`.
fn log_dir(logging: &LoggingConfig) -> std::path::PathBuf {
    logging
        .directory
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("countdown"))
}

/// Daily-rotated, non-blocking file writer. The worker guard lives in
/// `LOG_GUARD` so buffered lines are flushed at exit.
fn file_writer(
    logging: &LoggingConfig,
) -> Result<Option<tracing_appender::non_blocking::NonBlocking>, String> {
    if !logging.file {
        return Ok(None);
    }

    let dir = log_dir(logging);
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("create log dir {} failed: {e}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, "countdown.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Ok(Some(writer))
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    // RUST_LOG wins over the configured level
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(&logging.level)
            .map_err(|e| format!("invalid log level '{}': {e}", logging.level))?,
    };

    let file = file_writer(logging)?;
    if !logging.console && file.is_none() {
        return Err("logging enabled but both console and file output are off".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });
    let file_layer = file.map(|w| tracing_subscriber::fmt::layer().with_writer(w).with_ansi(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
