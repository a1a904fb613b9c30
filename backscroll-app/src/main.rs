use anyhow::{Context, Result};
use backscroll_common::observability::{LogConfig, init_logging};
use backscroll_config::{BackscrollConfig, BackscrollConfigLoader};
use backscroll_social::extract::Extractor;
use clap::Parser;
use cli::{Cli, Command};
use std::process::ExitCode;
use std::time::Duration;
use tether::Tether;

mod cli;
mod output;
mod sources;
mod tether;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error=%format!("{err:#}"), "cli.error");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let log_path = init_logging(LogConfig {
        format: cli.log_format,
        emit_stderr: cli.verbose,
        default_filter: if cli.verbose { "debug" } else { "info" },
        ..LogConfig::default()
    })?;
    tracing::debug!(log=%log_path.display(), "cli.logging_ready");

    let mut stdout = std::io::stdout().lock();

    if let Command::Extract {
        timestamp,
        text,
        tag,
    } = &cli.command
    {
        let extractor = Extractor::new(tag).with_context(|| format!("bad source tag {tag:?}"))?;
        output::write_json(&mut stdout, &extractor.extract(timestamp.as_str(), text))?;
        return Ok(ExitCode::SUCCESS);
    }

    // Env wins over the file.
    let cfg: BackscrollConfig = BackscrollConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let tether = Tether::new(cfg);
    tether.spawn_shutdown(cli.timeout_secs.map(Duration::from_secs));

    match cli.command {
        Command::Window {
            source,
            entity,
            start,
            end,
        } => {
            tether
                .window(&mut stdout, &source, &entity, start, end)
                .await
        }
        Command::Since {
            source,
            entities,
            since,
            lookback_days,
        } => {
            tether
                .since(&mut stdout, &source, entities, since, lookback_days)
                .await
        }
        Command::Extract { .. } => Ok(ExitCode::SUCCESS),
    }
}
