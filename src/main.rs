use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use config::{OutputFormat, UserConfig};
use tracing::error;

mod command;
mod config;
mod lockfile;
mod repositories;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    ///config file (YAML), defaults to $CHARTLOCK_CONFIG when set
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the dependencies declared in <CHART_DIR>/Chart.yaml
    Resolve {
        chart_dir: PathBuf,
        ///directory holding cached <alias>-index.yaml files
        #[arg(long)]
        repository_cache: Option<PathBuf>,
        ///repositories.yaml used to derive aliases
        #[arg(long)]
        repository_config: Option<PathBuf>,
        ///explicit alias for a dependency key, e.g. "alpine-0=stable"
        #[arg(short, long = "alias", value_name = "KEY=ALIAS", value_parser = command::parse_alias)]
        aliases: Vec<(String, String)>,
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
        ///write <CHART_DIR>/Chart.lock instead of printing
        #[arg(short, long)]
        write: bool,
    },
    /// Exit non-zero if <CHART_DIR>/Chart.lock is stale
    Verify { chart_dir: PathBuf },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let user_config = match UserConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    //logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&user_config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let result = match args.command {
        Command::Resolve {
            chart_dir,
            repository_cache,
            repository_config,
            aliases,
            output,
            write,
        } => {
            let mut config = user_config.resolve();
            if let Some(dir) = repository_cache {
                config.repository_cache = dir;
            }
            if let Some(file) = repository_config {
                config.repository_config = file;
            }
            let options = command::ResolveOptions {
                chart_dir,
                aliases,
                output: output.unwrap_or(config.output),
                write,
            };
            command::resolve(&config, &options).map(|_| ())
        }
        Command::Verify { chart_dir } => command::verify(&chart_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
