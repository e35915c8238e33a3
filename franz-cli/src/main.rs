//! # Franz CLI
//!
//! Launches the drawing agent and keeps it going until the VLM endpoint is
//! gone for good or the process is killed.
//!
//! Usage:
//!   franz
//!   franz --run-dir panel_log/run_20250101_120000
//!   franz --config sampling.toml --api-base http://gpu:8000/v1 -v
//!
//! Restarting with the same `--run-dir` resumes from its `state.json`.

use anyhow::Context;
use clap::Parser;
use franz_agent::{Agent, InferenceGateway};
use franz_core::provider::{RetryPolicy, DEFAULT_BASE_URL, DEFAULT_MODEL};
use franz_core::{
    resolve_run_dir, FileTurnStore, HotConfig, OpenAIProvider, ProviderConfig, RunSettings,
    SamplingConfig, SubprocessExecutor,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "franz")]
#[command(author, version, about = "Franz - a VLM that draws, looks, and rewrites its own story")]
struct Cli {
    /// Run directory to use (or resume); created fresh under --log-root if absent
    #[arg(long, env = "FRANZ_RUN_DIR")]
    run_dir: Option<PathBuf>,

    /// Where fresh run directories are created
    #[arg(long, default_value = "panel_log")]
    log_root: PathBuf,

    /// Sampling config (TOML), re-read at the start of every turn
    #[arg(short, long, env = "FRANZ_CONFIG")]
    config: Option<PathBuf>,

    /// OpenAI-compatible base URL (everything before /chat/completions)
    #[arg(long, env = "FRANZ_API_BASE", default_value = DEFAULT_BASE_URL)]
    api_base: String,

    /// Vision model id
    #[arg(short, long, env = "FRANZ_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Bearer token, if the endpoint wants one
    #[arg(long, env = "FRANZ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Extra HTTP header for the endpoint, as NAME=VALUE (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Seconds before a VLM request is abandoned and retried; 0 waits forever
    #[arg(long, default_value = "0")]
    request_timeout: u64,

    /// VLM calls per turn before the run gives up, the first one included
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Program that runs the actions and renders the screenshot
    #[arg(long, default_value = "python3")]
    executor: String,

    /// Argument passed to the executor program (repeatable)
    #[arg(long = "executor-arg", default_value = "execute.py")]
    executor_args: Vec<String>,

    /// Seconds before a hung executor is killed; 0 waits forever
    #[arg(long, default_value = "300")]
    executor_timeout: u64,

    /// Drawing surface width
    #[arg(long, default_value = "512")]
    width: u32,

    /// Drawing surface height
    #[arg(long, default_value = "288")]
    height: u32,

    /// Do not annotate screenshots with visual marks
    #[arg(long)]
    no_marks: bool,

    /// Parse actions but do not run them
    #[arg(long)]
    dry_run: bool,

    /// Drive the real mouse and keyboard
    #[arg(long)]
    physical: bool,

    /// Run the executor without its sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Pause between turns, in milliseconds
    #[arg(long, default_value = "10")]
    loop_delay_ms: u64,

    /// Tool to switch off (repeatable)
    #[arg(long = "disable-tool")]
    disabled_tools: Vec<String>,

    /// Debug logging (payload sizes, executor stderr)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    fn run_settings(&self, run_dir: PathBuf) -> RunSettings {
        let mut settings = RunSettings::new(run_dir)
            .with_surface(self.width, self.height)
            .with_loop_delay(Duration::from_millis(self.loop_delay_ms));
        settings.marks = !self.no_marks;
        settings.execute_actions = !self.dry_run;
        settings.physical_execution = self.physical;
        settings.sandbox = !self.no_sandbox;
        for tool in &self.disabled_tools {
            settings = settings.disable_tool(tool.as_str());
        }
        settings
    }

    fn hot_config(&self) -> HotConfig {
        match &self.config {
            Some(path) => HotConfig::watching(path),
            None => HotConfig::fixed(SamplingConfig::default()),
        }
    }

    fn executor(&self) -> SubprocessExecutor {
        let timeout = (self.executor_timeout > 0).then(|| Duration::from_secs(self.executor_timeout));
        SubprocessExecutor::new(&self.executor)
            .with_args(&self.executor_args)
            .with_timeout(timeout)
    }

    fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::local(&self.api_base, &self.model);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        if self.request_timeout > 0 {
            config = config.with_timeout(self.request_timeout);
        }
        for (name, value) in &self.headers {
            config = config.with_header(name, value);
        }
        config
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

fn init_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to install log subscriber")
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let run_dir = resolve_run_dir(cli.run_dir.as_deref(), &cli.log_root)?;
    let settings = cli.run_settings(run_dir.clone());
    let provider = OpenAIProvider::new(cli.provider_config())?;

    tracing::info!(
        run_dir = %run_dir.display(),
        endpoint = %cli.api_base,
        model = %cli.model,
        width = settings.width,
        height = settings.height,
        execute_actions = settings.execute_actions,
        "starting franz"
    );

    let mut agent = Agent::new(
        settings,
        cli.hot_config(),
        cli.executor(),
        InferenceGateway::new(provider).with_retry(cli.retry_policy()),
        FileTurnStore::in_dir(&run_dir),
    )
    .resume();

    match agent.run_forever().await {
        Ok(never) => match never {},
        Err(e) => Err(e).with_context(|| format!("agent stopped at turn {}", agent.turn())),
    }
}

/// The trace logged when a run dies.
///
/// The franz error inside the context chain prints its own Debug form: kind,
/// status, operation, context and the lower-level causes.
fn fatal_report(err: &anyhow::Error) -> String {
    match err.chain().find_map(|cause| cause.downcast_ref::<franz_core::Error>()) {
        Some(inner) => format!("{}\n{:?}", err, inner),
        None => format!("{:?}", err),
    }
}

/// Process exit status for a finished run.
fn finish(result: anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{}", fatal_report(&e));
            1
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::from(finish(run(cli).await))
}
