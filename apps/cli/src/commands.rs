//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use webcontext_core::{UpdateSink, WebSearchPipeline, WebSearchRequest};
use webcontext_shared::{
    AppConfig, RagSettings, WebSearchRun, WebSearchUpdate, init_config, load_config,
    validate_search_credentials,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// webcontext: ground answers in fresh web pages.
#[derive(Parser)]
#[command(
    name = "webcontext",
    version,
    about = "Search the web and extract the passages most relevant to a prompt.",
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
    /// Run a web search and print the ranked context.
    Search {
        /// Question to search for.
        prompt: String,

        /// Use these links instead of searching (repeatable).
        #[arg(long = "link")]
        links: Vec<String>,

        /// Restrict the search to these domains (repeatable).
        #[arg(long = "domain")]
        domains: Vec<String>,

        /// Embedding model id (defaults to the configured default).
        #[arg(long)]
        model: Option<String>,

        /// Print the full run record as JSON.
        #[arg(long)]
        json: bool,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "webcontext=info",
        1 => "webcontext=debug",
        _ => "webcontext=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
            prompt,
            links,
            domains,
            model,
            json,
        } => cmd_search(prompt, links, domains, model, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

async fn cmd_search(
    prompt: String,
    links: Vec<String>,
    domains: Vec<String>,
    model: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;

    // Direct links never reach the search provider
    if links.is_empty() {
        validate_search_credentials(&config)?;
    }

    let pipeline = WebSearchPipeline::from_app_config(&config)?;

    let rag = (!links.is_empty() || !domains.is_empty()).then(|| RagSettings {
        allowed_links: links,
        allowed_domains: domains,
    });
    let request = WebSearchRequest {
        embedding_model: model,
        rag,
        ..WebSearchRequest::from_prompt(prompt)
    };

    info!(provider = %config.search.provider, "running web search");

    let reporter = CliProgress::new()?;
    let run = pipeline.run(&request, &reporter).await;
    reporter.finish();

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    if let Some(err) = &run.error {
        return Err(eyre!("web search failed: {err}"));
    }

    print_run(&run);
    Ok(())
}

fn print_run(run: &WebSearchRun) {
    println!();
    if !run.search_query.is_empty() {
        println!("  Query:   {}", run.search_query);
    }
    println!("  Results: {}", run.results.len());
    println!("  Sources: {}", run.context_sources.len());

    for (i, source) in run.context_sources.iter().enumerate() {
        println!();
        let title = source
            .result
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&source.result.hostname);
        println!("  [{}] {title}", i + 1);
        println!("      {}", source.result.display_link());

        for entry in &source.context {
            println!();
            println!("      #{} {}", entry.rank_index + 1, entry.text);
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress sink that drives an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl UpdateSink for CliProgress {
    fn notify(&self, update: WebSearchUpdate) {
        match update {
            WebSearchUpdate::Update { message, args } => {
                self.spinner.set_message(format_update(&message, &args));
            }
            WebSearchUpdate::Error { message, args } => {
                self.spinner
                    .println(format!("  ! {}", format_update(&message, &args)));
            }
            WebSearchUpdate::Sources { sources } => {
                self.spinner
                    .set_message(format!("Found {} sources", sources.len()));
            }
        }
    }
}

fn format_update(message: &str, args: &[String]) -> String {
    if args.is_empty() {
        message.to_string()
    } else {
        format!("{message}: {}", args.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

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
