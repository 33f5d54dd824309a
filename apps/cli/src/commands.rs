//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use nobestudy_core::{ExportForm, ExportOutcome, Nobestudy, ProbeVerdict, ProgressReporter};
use nobestudy_shared::{AppConfig, FileType, ScrapeResult, init_config, load_config};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Nobestudy: summaries from encyclopedia sources, exported as documents.
#[derive(Parser)]
#[command(
    name = "nobestudy",
    version,
    about = "Look a topic up across encyclopedia sources and export the summary.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Retrieve and summarize a topic.
    Search {
        /// Topic to look up; several words are joined with spaces.
        #[arg(required = true)]
        query: Vec<String>,

        /// Query type: definition, essay, analysis, or description.
        #[arg(short = 't', long = "type")]
        query_type: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Render content into a document and save it.
    Export {
        /// Topic the content is about.
        #[arg(required = true)]
        query: Vec<String>,

        /// Query type used for the title line.
        #[arg(short = 't', long = "type")]
        query_type: Option<String>,

        /// Content text.
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the content text from a file.
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Image URL to embed (repeatable).
        #[arg(long = "image")]
        images: Vec<String>,

        /// Output format: pdf, ppt, or docx.
        #[arg(short, long, default_value = "pdf")]
        format: FileType,

        /// Where to save the file (defaults to the format's file name in the
        /// current directory).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "nobestudy=info",
        1 => "nobestudy=debug",
        _ => "nobestudy=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search {
            query,
            query_type,
            json,
        } => cmd_search(&query, query_type.as_deref(), json).await,
        Command::Export {
            query,
            query_type,
            content,
            content_file,
            images,
            format,
            out,
        } => {
            let content = match (content, content_file) {
                (Some(text), _) => Some(text),
                (None, Some(path)) => Some(
                    std::fs::read_to_string(&path)
                        .map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?,
                ),
                (None, None) => None,
            };
            let form = ExportForm {
                query: Some(query.join(" ")),
                query_type,
                content,
                file_type: format,
                images,
            };
            cmd_export(form, out).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_search(query: &[String], query_type: Option<&str>, json: bool) -> Result<()> {
    let config = load_config()?;
    let query = query.join(" ");
    let query_type = query_type.unwrap_or(&config.defaults.query_type);

    info!(query = %query, query_type, "searching");

    let service = Nobestudy::from_config(&config)?;
    let reporter = CliProgress::new();
    let result = service
        .search_with_progress(&query, query_type, &reporter)
        .await;
    reporter.finish();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &ScrapeResult) {
    println!();
    println!("{}", result.content);
    if !result.images.is_empty() {
        println!();
        println!("  Images:");
        for url in &result.images {
            println!("    {url}");
        }
    }
    if !result.related_keywords.is_empty() {
        println!();
        println!("  Related: {}", result.related_keywords.join(", "));
    }
    println!();
}

async fn cmd_export(form: ExportForm, out: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let service = Nobestudy::from_config(&config)?;

    match service.export(form).await? {
        ExportOutcome::Delivered(file) => {
            let dest = out.unwrap_or_else(|| PathBuf::from(file.file_name()));
            let file_type = file.file_type;
            let sha256 = file.sha256.clone();
            let bytes = file.deliver_to(&dest, config.export.keep_outputs)?;

            println!();
            println!("  Export complete!");
            println!("  Format: {file_type} ({})", file_type.mime_type());
            println!("  File:   {}", dest.display());
            println!("  Size:   {bytes} bytes");
            println!("  SHA256: {sha256}");
            println!();
        }
        ExportOutcome::Degraded { file_type, reason } => {
            warn!(%file_type, "no file produced");
            eprintln!("{file_type} export failed, nothing was written: {reason}");
        }
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn source_started(&self, name: &str) {
        self.spinner.set_message(format!("Probing {name}"));
    }

    fn source_finished(&self, name: &str, verdict: &ProbeVerdict) {
        self.spinner
            .set_message(format!("{name}: {}", verdict.describe()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_parses_format_and_repeated_images() {
        let cli = Cli::try_parse_from([
            "nobestudy", "export", "black", "hole", "--type", "essay", "--content", "text",
            "--image", "https://a/1.png", "--image", "https://a/2.png", "--format", "pptx",
        ])
        .unwrap();
        let Command::Export {
            query,
            images,
            format,
            ..
        } = cli.command
        else {
            panic!("expected export command");
        };
        assert_eq!(query, ["black", "hole"]);
        assert_eq!(images.len(), 2);
        assert_eq!(format, FileType::Ppt);
    }

    #[test]
    fn export_rejects_both_content_sources() {
        let parsed = Cli::try_parse_from([
            "nobestudy", "export", "q", "--content", "x", "--content-file", "x.txt",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let parsed = Cli::try_parse_from(["nobestudy", "export", "q", "--format", "odt"]);
        assert!(parsed.is_err());
    }
}
