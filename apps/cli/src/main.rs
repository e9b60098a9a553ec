//! trackql - compile issue-tracker search queries from the command line
//!
//! Every command prints JSON on stdout. Query errors are reported on stderr
//! with a non-zero exit code.

mod config;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use trackql_query::{BuilderQuery, QueryEngine, QueryMode, Schema};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "trackql", version, about = "Compile issue-tracker search queries")]
struct Cli {
    /// Schema file (JSON)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Comma-separated fields the caller may use (default: all)
    #[arg(long, global = true, value_delimiter = ',')]
    permitted: Option<Vec<String>>,

    /// Config file (default: ./trackql.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a filter expression to a predicate
    Compile {
        query: String,
        #[arg(long, value_enum, default_value_t = Mode::Filter)]
        mode: Mode,
    },
    /// Parse a sort clause
    Sort { text: String },
    /// Compile search text with an optional `sort by:` clause
    Search { text: String },
    /// Render a builder query (JSON file, `-` for stdin) as query text
    Build { file: PathBuf },
    /// Parse query text into builder form
    Parse { text: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Filter,
    Search,
}

impl From<Mode> for QueryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Filter => QueryMode::Filter,
            Mode::Search => QueryMode::Search,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let schema_path = cli
        .schema
        .as_deref()
        .or(config.schema.as_deref())
        .context("No schema given; pass --schema or set `schema` in the config file")?;
    let schema = load_schema(schema_path)?;

    tracing::debug!(
        schema = %schema_path.display(),
        fields = schema.fields.len(),
        hashtags = schema.hashtags.len(),
        "Schema loaded"
    );

    let mut engine = QueryEngine::new(&schema).with_config(config.query.clone());
    if let Some(permitted) = cli.permitted.as_deref() {
        engine = engine.with_permitted(permitted);
    }

    match &cli.command {
        Command::Compile { query, mode } => {
            let predicate = engine
                .parse_filter(query, (*mode).into())
                .with_context(|| format!("Failed to compile query {query:?}"))?;
            print_json(&predicate, cli.pretty)
        }
        Command::Sort { text } => {
            let sort = engine
                .parse_sort(text)
                .with_context(|| format!("Failed to parse sort clause {text:?}"))?;
            print_json(&sort, cli.pretty)
        }
        Command::Search { text } => {
            let compiled = engine
                .search(text)
                .with_context(|| format!("Failed to compile search {text:?}"))?;
            print_json(&compiled, cli.pretty)
        }
        Command::Build { file } => {
            let query: BuilderQuery = serde_json::from_str(&read_input(file)?)
                .context("Failed to parse builder query JSON")?;
            let response = engine.build(&query).context("Failed to build query")?;
            print_json(&response, cli.pretty)
        }
        Command::Parse { text } => {
            let response = engine
                .parse_builder(text)
                .with_context(|| format!("Failed to parse query {text:?}"))?;
            print_json(&response, cli.pretty)
        }
    }
}

fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid schema {}", path.display()))
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
