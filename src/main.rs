use anyhow::{Context, Result};
use clap::Parser;
use converge::cli::Cli;
use converge::command::ConvergeCommand;
use converge::converge::{CancelToken, Converger, Gofmt, MergeStats, Passthrough};
use converge::traits::SourceFormatter;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    converge::logging::init(cli.verbose);
    debug!(?cli, "Parsed arguments");

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let stats = if cli.no_format {
        run(&cli, Passthrough, &cancel).await?
    } else {
        run(&cli, Gofmt::with_program(&cli.formatter), &cancel).await?
    };

    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

async fn run<F>(cli: &Cli, formatter: F, cancel: &CancelToken) -> Result<MergeStats>
where
    F: SourceFormatter,
{
    let rule = cli.scan_rule().context("failed to compile exclude patterns")?;
    let converger = Converger::new(formatter)
        .with_rule(rule)
        .with_workers(cli.workers)
        .with_timeout(cli.timeout());

    let mut command = ConvergeCommand::new(converger, &cli.dir);
    if let Some(output) = &cli.output {
        command = command.with_destination(output);
    }

    let mut stdout = tokio::io::stdout();
    let merged = command
        .run(&mut stdout, cancel)
        .await
        .with_context(|| format!("failed to converge '{}'", cli.dir.display()))?;

    Ok(merged.stats)
}
