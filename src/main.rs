use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use optrl::cli::output::{print_prices, OutputMode};
use optrl::cli::{Cli, Commands};
use optrl::config::LoggingConfig;
use optrl::experiment::{ExperimentPaths, ExperimentRunner};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    let mode = OutputMode::from_json_flag(cli.json);

    match &cli.command {
        Commands::Run {
            experiment_no,
            flow,
            ..
        } => {
            let paths = ExperimentPaths::new(&config.experiments_dir, experiment_no);
            let _guard = init_logging(&config.logging, paths.log_dir(*flow).as_deref());

            let algorithm = cli.command.algorithm();
            let runner = ExperimentRunner::new(config, experiment_no.clone(), algorithm)?;
            let report = runner.run(*flow)?;
            info!(
                experiment = %report.metadata.experiment_id,
                seconds = report.metadata.training_time_secs,
                "Run finished"
            );
            print_prices(&report.results, mode)?;
        }
        Commands::Baseline { .. } => {
            let _guard = init_logging(&config.logging, None);
            let runner = ExperimentRunner::new(config, "baseline", cli.command.algorithm())?;
            print_prices(&runner.baseline()?, mode)?;
        }
    }

    Ok(())
}

/// Console logging plus an optional plain-text file under `log_dir`
///
/// The returned guard flushes the file writer on drop and must outlive the run.
fn init_logging(config: &LoggingConfig, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // `rolling::never` panics if the file cannot be created, so check writability first.
    let (file_layer, guard) = match log_dir {
        Some(dir) if writable(dir) => {
            let appender = tracing_appender::rolling::never(dir, "optrl.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        Some(dir) => {
            eprintln!(
                "Warning: Could not write to log directory {}, file logging disabled",
                dir.display()
            );
            (None, None)
        }
        None => (None, None),
    };

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

fn writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let marker = dir.join(".optrl_write_test");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker)
    {
        Ok(_) => {
            let _ = std::fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}
