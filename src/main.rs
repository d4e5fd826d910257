use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, info};
use std::path::PathBuf;
use std::process::ExitCode;

use election_report::analyzer::merge_timeline;
use election_report::batch::{analyze_group, analyze_run_dir};
use election_report::config::AnalyzerConfig;
use election_report::report::{render_group, render_run, render_timeline_entry};
use election_report::source::LogLoader;

#[derive(Parser)]
#[command(name = "election-report")]
#[command(about = "Merge per-node raft election logs and report cluster availability")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Comma-separated, ordered peer addresses (`local` or `user@host`)
    #[arg(long, value_delimiter = ',', global = true)]
    peers: Vec<String>,

    /// Stop each run at the first repair after a node is stopped
    #[arg(long, global = true)]
    kill: bool,

    /// File name of each node's log inside its directory
    #[arg(long, global = true)]
    log_file: Option<String>,

    /// Field marking a record as emitted by a cluster member
    #[arg(long, global = true)]
    membership_field: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging for this tool
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one run directory (`<DIR>/<n>/<log-file>` for the n-th peer)
    Run { dir: String },

    /// Analyze every run in each experiment group directory
    Batch {
        #[arg(required = true, value_delimiter = ',')]
        dirs: Vec<String>,
    },

    /// Print the merged timeline of local node logs (file order gives the node index)
    Timeline {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    /// Config file values overridden by command-line flags.
    fn resolve_config(&self) -> anyhow::Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::load(path)?,
            None => AnalyzerConfig::default(),
        };

        if !self.peers.is_empty() {
            config.peers = self.peers.clone();
        }
        if self.kill {
            config.kill_mode = true;
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = log_file.clone();
        }
        if let Some(field) = &self.membership_field {
            config.membership_field = field.clone();
        }
        Ok(config)
    }
}

fn execute(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config()?;

    match &cli.command {
        Commands::Run { dir } => {
            config.validate()?;
            let report = analyze_run_dir(&config, dir)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_run(dir, &report));
            }
        }
        Commands::Batch { dirs } => {
            config.validate()?;
            let mut summaries = Vec::with_capacity(dirs.len());
            for dir in dirs {
                summaries.push(analyze_group(&config, dir)?);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for summary in &summaries {
                    println!("{}", render_group(summary));
                }
            }
        }
        Commands::Timeline { files } => {
            let mut sources = Vec::with_capacity(files.len());
            for file in files {
                let loader = LogLoader::open(file)
                    .with_context(|| format!("Failed to open {}", file.display()))?;
                sources.push(loader);
            }
            let warnings = merge_timeline(sources, &config.run_options(), |record| {
                println!("{}", render_timeline_entry(record));
            })?;
            for warning in warnings {
                eprintln!("warning: {}", warning);
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(
            Some("election_report"),
            if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info },
        )
        .parse_default_env()
        .init();

    info!("Starting up");

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
