use std::io::IsTerminal;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::{fmt, EnvFilter};

use surge_core::{Check, CheckSet, RunConfig};
use surge_engine::Orchestrator;

mod presets;
mod report;

use presets::Preset;
use report::print_report;

#[derive(Parser, Debug)]
#[command(name = "surge")]
#[command(about = "Staged HTTP load generation with pass/fail checks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a load run against a target
    Run {
        /// Path to a YAML run configuration
        #[arg(long, env = "SURGE_CONFIG")]
        config: Option<String>,

        /// Named preset used when no config file is given
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Target URL override
        #[arg(long)]
        url: Option<String>,

        /// Expected HTTP status for the built-in check
        #[arg(long, default_value_t = 200)]
        expect_status: u16,

        /// Think time between a user's requests, in seconds
        #[arg(long)]
        think_time: Option<f64>,

        /// Per-request timeout, in seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Ramp interpolation between stages (step or linear)
        #[arg(long)]
        ramp: Option<String>,

        /// Print the summary as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Generate a run configuration template
    GenerateConfig {
        /// Output configuration file path
        #[arg(long, default_value = "surge.yaml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            preset,
            url,
            expect_status,
            think_time,
            timeout,
            ramp,
            json,
        } => {
            run(
                config,
                preset,
                url,
                expect_status,
                think_time,
                timeout,
                ramp,
                json,
            )
            .await
        }
        Commands::GenerateConfig { output } => generate_config(&output),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    config_path: Option<String>,
    preset: Option<Preset>,
    url: Option<String>,
    expect_status: u16,
    think_time: Option<f64>,
    timeout: Option<f64>,
    ramp: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match (config_path, preset) {
        (Some(path), _) => RunConfig::from_file(&path)?,
        (None, Some(preset)) => preset.config(),
        (None, None) => RunConfig::load()?,
    };

    if let Some(url) = url {
        config.target_url = url;
    }
    if let Some(think_time) = think_time {
        config.think_time_secs = think_time;
    }
    if let Some(timeout) = timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(ramp) = ramp {
        config.ramp = ramp
            .parse()
            .map_err(|()| format!("invalid ramp `{ramp}`: use step or linear"))?;
    }
    config.validate()?;

    let checks = CheckSet::new().with(Check::status_is(expect_status));
    let mut orchestrator = Orchestrator::from_config(&config, checks)?;
    let total = orchestrator.schedule().total_duration();

    println!("Starting load run:");
    println!("  Target URL: {}", config.target_url);
    println!("  Method:     {}", config.method.as_str());
    println!("  Stages:     {}", config.stages.len());
    println!("  Duration:   {:.0}s", total.as_secs_f64());
    println!("  Ramp:       {}", config.ramp.as_str());

    // Ctrl-C drains the run instead of killing it.
    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, draining run");
            stop.stop();
        }
    });

    let progress = if std::io::stdout().is_terminal() {
        ProgressBar::new(total.as_secs().max(1))
    } else {
        ProgressBar::hidden()
    };
    progress.set_message("running");
    let progress_task = {
        let progress = progress.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let mut tick = tokio::time::interval(Duration::from_millis(250));
            loop {
                tick.tick().await;
                let elapsed = started.elapsed();
                if elapsed >= total {
                    break;
                }
                progress.set_position(elapsed.as_secs());
            }
        })
    };

    let summary = orchestrator.run().await?;

    progress_task.abort();
    progress.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_report(&summary);
    }

    Ok(())
}

fn generate_config(output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let template = r#"# Surge run configuration

# Target hit by every virtual user.
target_url: "http://localhost:8180/test"
method: get            # get | post | head

# Pause between a user's requests, seconds.
think_time_secs: 0.1

# Per-request deadline, seconds.
request_timeout_secs: 30.0

# How often the orchestrator reconciles the user pool, seconds.
tick_interval_secs: 1.0

# step holds each stage's literal target; linear ramps between targets.
ramp: step

# Ordered load stages. Total run time is the sum of durations.
stages:
  - duration_secs: 10
    target: 10
  - duration_secs: 30
    target: 10
  - duration_secs: 10
    target: 0
"#;

    std::fs::write(output, template)?;
    println!("Configuration template written to: {output}");
    println!("\nRun it with:");
    println!("  surge run --config {output}");
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_target(false).init();
}
