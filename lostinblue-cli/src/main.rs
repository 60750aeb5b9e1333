use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use lostinblue::{
    ConfigOverrides, Corpus, EncodingMode, SearchConfig, SearchError, SearchOptions, SearchOutput,
};
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CorpusArgs {
    /// Root directory to load
    #[arg(short = 'd', long = "path")]
    root: Option<PathBuf>,

    /// Number of worker threads per query
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// Queue capacity per worker
    #[arg(long)]
    buffering: Option<NonZeroUsize>,

    /// Regex a file path must match to be searched
    #[arg(long)]
    include: Option<String>,

    /// Regex that prunes matching directories
    #[arg(long)]
    exclude: Option<String>,

    /// Lines of context above and below each match
    #[arg(short = 'C', long)]
    context: Option<usize>,

    /// Matches kept per file
    #[arg(long)]
    max_matches: Option<usize>,

    /// Leave out unreadable files instead of failing
    #[arg(long)]
    skip_errors: bool,

    /// Replace invalid UTF-8 instead of failing
    #[arg(long)]
    lossy: bool,

    /// Configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Show only statistics, not matches
    #[arg(short, long)]
    stats: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the tree once and run each query against it
    Query {
        /// Regular expressions to search for
        #[arg(required = true)]
        queries: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        #[command(flatten)]
        corpus: CorpusArgs,
    },

    /// Load the tree once and read queries from stdin, one per line
    Repl {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            queries,
            pretty,
            corpus,
        } => {
            if queries.iter().any(String::is_empty) {
                bail!("missing query");
            }
            let (corpus_data, options) = load_corpus(&corpus)?;
            for query in &queries {
                let output = run_query(&corpus_data, query, &options)?;
                print_output(&output, corpus.stats, pretty)?;
            }
            Ok(())
        }
        Commands::Repl { corpus } => {
            let (corpus_data, options) = load_corpus(&corpus)?;
            repl(&corpus_data, &options, corpus.stats)
        }
    }
}

fn load_corpus(args: &CorpusArgs) -> Result<(Corpus, SearchOptions)> {
    let config = SearchConfig::load_from(args.config.as_deref())
        .map_err(|e| SearchError::config_error(e.to_string()))?
        .merge_with_cli(ConfigOverrides {
            root_path: args.root.clone(),
            include_pattern: args.include.clone(),
            exclude_pattern: args.exclude.clone(),
            thread_count: args.workers,
            buffering: args.buffering,
            max_matches_per_file: args.max_matches,
            context_lines: args.context,
            encoding_mode: args.lossy.then_some(EncodingMode::Lossy),
            skip_errors: args.skip_errors,
            log_level: args.log_level.clone(),
        });

    init_logging(&config.log_level);

    let started = Instant::now();
    let corpus = Corpus::load(&config)
        .with_context(|| format!("Failed to load {}", config.root_path.display()))?;
    info!(
        "Loaded {} files in {}",
        corpus.len(),
        humantime::format_duration(started.elapsed())
    );
    if !corpus.load_errors().is_empty() {
        info!("Skipped {} unreadable files", corpus.load_errors().len());
    }

    let options = SearchOptions::from(&config);
    Ok((corpus, options))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_query(corpus: &Corpus, query: &str, options: &SearchOptions) -> Result<SearchOutput> {
    let started = Instant::now();
    let output = corpus.search(query, options)?;
    info!(
        "Query '{}' took {}",
        query,
        humantime::format_duration(started.elapsed())
    );
    corpus.metrics().log_stats();
    Ok(output)
}

fn repl(corpus: &Corpus, options: &SearchOptions, stats_only: bool) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let query = line.trim_end_matches('\r');
        if query.is_empty() {
            eprintln!("{}", "error: missing query".red());
            continue;
        }

        match run_query(corpus, query, options) {
            Ok(output) => print_output(&output, stats_only, false)?,
            Err(e) => match e.downcast_ref::<SearchError>() {
                Some(SearchError::InvalidPattern(_)) => eprintln!("{} {}", "error:".red(), e),
                _ => return Err(e),
            },
        }
        io::stdout().flush()?;
    }
    Ok(())
}

fn print_output(output: &SearchOutput, stats_only: bool, pretty: bool) -> Result<()> {
    for error in &output.errors {
        eprintln!("{} {}", "skipped:".yellow(), error);
    }

    if stats_only {
        println!(
            "Found {} matches in {} files ({} searched)",
            output.total_matches().to_string().green(),
            output.files_with_matches().to_string().green(),
            output.files_searched
        );
        return Ok(());
    }

    println!("{}", output.to_json(pretty)?);
    Ok(())
}
