use anyhow::Result;
use clap::{Parser, Subcommand};
use crossforge::builder::{clean, Builder};
use crossforge::config::{resolve_work_paths, Config, ConfigArgs};
use crossforge::package;
use std::env;
use tracing::{info, subscriber, Level};
use tracing_subscriber::{fmt::writer::MakeWriterExt, FmtSubscriber};

#[derive(Subcommand)]
enum Command {
    /// Fetch, patch, build and install the toolchain
    Build {
        /// Print the plan instead of running it
        #[arg(default_value_t = false, long)]
        dry_run: bool,
    },

    /// Download, extract, patch and link sources only
    Fetch,

    /// Print every action a build would perform
    Plan,

    /// Remove the build tree
    Clean {
        /// Remove downloaded archives as well
        #[arg(default_value_t = false, long)]
        downloads: bool,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Log level
    #[arg(default_value_t = Level::INFO, global = true, long)]
    level: Level,
}

fn print_plan(config: Config) -> Result<()> {
    for line in Builder::new(config).plan()? {
        println!("{}", line);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        config,
        level,
    } = Cli::parse();

    // Setup logging

    let subscriber_writer = std::io::stderr.with_max_level(level);

    let mut subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(subscriber_writer)
        .without_time();

    if [Level::DEBUG, Level::TRACE].contains(&level) {
        subscriber = subscriber.with_file(true).with_line_number(true);
    }

    let subscriber = subscriber.finish();

    subscriber::set_global_default(subscriber)?;

    match command {
        Command::Build { dry_run } => {
            let config = Config::resolve(&config)?;

            if dry_run {
                return print_plan(config);
            }

            info!(
                "building {} toolchain with {} jobs",
                config.triplets.target, config.jobs
            );

            Builder::new(config).run().await
        }

        Command::Fetch => Builder::new(Config::resolve(&config)?).fetch().await,

        Command::Plan => print_plan(Config::resolve(&config)?),

        Command::Clean { downloads } => {
            let (build_path, download_path) = resolve_work_paths(&config, &env::current_dir()?);

            clean(&build_path, &download_path, &package::archives(), downloads).await
        }
    }
}
