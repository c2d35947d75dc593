use anyhow::Result;
use bookwyrm::config::{find_config_file, load_config, Config};
use bookwyrm::models::{Criteria, Record, Request, RequestError, YearFilter};
use bookwyrm::sources::{builtin_ids, SourceRegistry};
use bookwyrm::utils::HttpClient;
use bookwyrm::{Orchestrator, OrchestratorConfig, Resolver};
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bookwyrm - find books and papers online and download them
#[derive(Parser, Debug)]
#[command(name = "bookwyrm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find books and papers online and download them", long_about = None)]
struct Cli {
    /// Author; may be given several times
    #[arg(long, short, help_heading = "Inclusive criteria")]
    author: Vec<String>,

    #[arg(long, short, help_heading = "Inclusive criteria")]
    title: Option<String>,

    #[arg(long, short, help_heading = "Inclusive criteria")]
    series: Option<String>,

    #[arg(long, short, help_heading = "Inclusive criteria")]
    publisher: Option<String>,

    #[arg(long, help_heading = "Inclusive criteria")]
    journal: Option<String>,

    /// Year, optionally prefixed by >=, <=, > or <
    #[arg(long, short, help_heading = "Exact criteria")]
    year: Option<YearFilter>,

    #[arg(long, short, help_heading = "Exact criteria")]
    language: Option<String>,

    #[arg(long, short, help_heading = "Exact criteria")]
    edition: Option<u32>,

    /// File extension without the period, e.g. "pdf"
    #[arg(long, short = 'E', help_heading = "Exact criteria")]
    extension: Option<String>,

    #[arg(long, help_heading = "Exact criteria")]
    volume: Option<u32>,

    #[arg(long, help_heading = "Exact criteria")]
    number: Option<u32>,

    #[arg(long, short, help_heading = "Exact criteria")]
    isbn: Option<String>,

    /// DOI or URL to download; excludes every other criterion
    #[arg(long, short = 'd')]
    ident: Option<String>,

    /// Fuzzy match threshold out of 100
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    accuracy: Option<u32>,

    /// Directory downloads are written to
    #[arg(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// List the compiled-in sources and exit
    #[arg(long)]
    list_sources: bool,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    fn criteria(&self) -> Criteria {
        Criteria {
            authors: self.author.clone(),
            title: self.title.clone(),
            series: self.series.clone(),
            publisher: self.publisher.clone(),
            journal: self.journal.clone(),
            year: self.year,
            language: self.language.clone(),
            edition: self.edition,
            extension: self.extension.clone(),
            volume: self.volume,
            number: self.number,
            isbn: self.isbn.clone(),
            ident: self.ident.clone(),
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = if quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bookwyrm={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_record(record: &Record) {
    println!("{}", record);
    for mirror in record.mirrors() {
        println!("    {}", mirror);
    }
}

async fn search(config: &Config, client: &HttpClient, wanted: Record, json: bool) -> Result<()> {
    let registry = SourceRegistry::from_config(config, client)?;
    if registry.is_empty() {
        tracing::warn!("No sources enabled");
    }

    let orchestrator = Orchestrator::new(registry, OrchestratorConfig::from(config));
    let mut stream = orchestrator.search(wanted);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            record = stream.next() => match record {
                Some(record) if !json => print_record(&record),
                Some(_) => {}
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::warn!("Interrupted; waiting for sources to stop");
                stream.cancel();
                break;
            }
        }
    }

    let report = stream.finish().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (source, reason) in report.failed_sources() {
        eprintln!("{} failed: {}", source, reason);
    }
    if report.is_empty() {
        eprintln!("I couldn't find anything.");
    } else {
        println!("I found {} items!", report.matches.len());
    }
    Ok(())
}

async fn fetch(config: &Config, client: HttpClient, ident: &str, output_dir: &Path) -> Result<()> {
    let resolver = Resolver::from_config(&config.resolver, client)?;

    match resolver.fetch(ident).await? {
        Some(fetched) => {
            let path = fetched.save(output_dir).await?;
            println!("Saved {} from {}", path.display(), fetched.url);
        }
        None => eprintln!("I couldn't find anything."),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Load configuration from file if specified or found in the default location
    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let mut config = load_config(config_path.as_deref())?;
    if let Some(accuracy) = cli.accuracy {
        config.accuracy = accuracy;
    }

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    if cli.list_sources {
        for id in builtin_ids() {
            let state = if config.sources.is_enabled(id) {
                "enabled"
            } else {
                "disabled"
            };
            println!("{:<12} {}", id, state);
        }
        return Ok(());
    }

    let request = match cli.criteria().into_request() {
        Ok(request) => request,
        Err(RequestError::Empty) => {
            Cli::command().print_help()?;
            return Ok(());
        }
        Err(err) => Cli::command()
            .error(clap::error::ErrorKind::ArgumentConflict, err)
            .exit(),
    };

    let client = HttpClient::new(&config.http)?;
    match request {
        Request::Fetch(ident) => fetch(&config, client, &ident, &cli.output_dir).await,
        Request::Search(wanted) => search(&config, &client, wanted, cli.json).await,
    }
}
