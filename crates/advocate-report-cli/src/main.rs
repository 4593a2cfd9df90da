//! advocate-report — entry point.

use std::io::Write;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use advocate_report::{ReportEngine, ReportId};
use advocate_report_cli::config::{load_config, resolve_config_path};
use advocate_report_cli::output;

#[derive(Parser)]
#[command(
    name = "advocate-report",
    about = "Run Advocate reports and print their data as text, JSON records, or XML",
    version
)]
struct Cli {
    /// Path to the JSON client config.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Run the report even if a cached copy exists.
    #[arg(long, global = true)]
    bypass_cache: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the raw delimited report data.
    Text {
        /// Report identifier.
        report_id: String,
    },

    /// Print the report as JSON records (one object per row).
    Records {
        /// Report identifier.
        report_id: String,

        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,

        /// Print an aligned table instead of JSON.
        #[arg(long, conflicts_with = "pretty")]
        table: bool,
    },

    /// Print the report as an XML document.
    Document {
        /// Report identifier.
        report_id: String,

        /// Indent nested elements.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate the config file without contacting the server.
    CheckConfig,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   advocate-report completions bash > ~/.local/share/bash-completion/completions/advocate-report
    ///   advocate-report completions zsh > ~/.zfunc/_advocate-report
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = resolve_config_path(cli.config.as_deref());

    let rendered = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "advocate-report", &mut std::io::stdout());
            return Ok(());
        }

        Commands::CheckConfig => {
            let config = load_config(&config_path)?;
            let poll = config.poll_policy()?;
            tracing::info!("Config: {}", config_path.display());
            format!(
                "Valid config: {}\n  Endpoint: {}\n  Max tries: {}\n  Sleep between tries: {:?}\n  Cache retention: {:?}\n",
                config_path.display(),
                config.api_url,
                poll.max_tries,
                poll.sleep_between_tries,
                config.cache_retention(),
            )
        }

        Commands::Text { report_id } => {
            let engine = open_engine(&config_path, cli.bypass_cache)?;
            engine.report_as_text(&ReportId::new(report_id)).await?
        }

        Commands::Records {
            report_id,
            pretty,
            table,
        } => {
            let engine = open_engine(&config_path, cli.bypass_cache)?;
            let records = engine.report_as_records(&ReportId::new(report_id)).await?;
            if table {
                output::records_table(&records)
            } else {
                output::records_json(&records, pretty)?
            }
        }

        Commands::Document { report_id, pretty } => {
            let engine = open_engine(&config_path, cli.bypass_cache)?;
            let document = engine.report_as_document(&ReportId::new(report_id)).await?;
            output::document_xml(&document, pretty)?
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

fn open_engine(config_path: &std::path::Path, bypass_cache: bool) -> anyhow::Result<ReportEngine> {
    let config = load_config(config_path)?;
    tracing::debug!("Endpoint: {}", config.api_url);
    let engine = ReportEngine::from_config(&config)
        .context("failed to create report engine")?
        .with_bypass_cache(bypass_cache || config.bypass_cache);
    Ok(engine)
}
