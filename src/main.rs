use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};

use kernel_parser::config::ParseConfig;
use kernel_parser::kernel::{self, StaticSymbols, SymbolCompleter};
use kernel_parser::logging::init_logger;
use kernel_parser::parser::Parser;
use kernel_parser::paths;

#[derive(ClapParser, Debug)]
#[command(
    name = "kernel-parser",
    version,
    about = "Magic detection, help targets and path completion for interactive kernels"
)]
struct Cli {
    /// JSON file with a parser configuration (overrides --preset)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Built-in call syntax to use when no --config is given
    #[arg(long, global = true, value_enum, default_value_t = Preset::Python)]
    preset: Preset,

    /// Log level filter (otherwise RUST_LOG, else "info")
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output
    #[arg(long, global = true)]
    no_color: bool,

    /// Also write a debug-level session log to the user cache directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    Python,
    Lisp,
}

#[derive(Args, Debug)]
struct Source {
    /// Code to analyze
    #[arg(long, conflicts_with = "file")]
    code: Option<String>,

    /// Read the code from a file (default: stdin)
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Source {
    fn read(&self) -> Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if let Some(path) = &self.file {
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()));
        }
        let mut code = String::new();
        io::stdin()
            .read_to_string(&mut code)
            .context("Failed to read code from stdin")?;
        Ok(code)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the full analysis record
    Analyze {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Cursor offset in bytes (default: end of text)
        #[arg(long)]
        end: Option<usize>,
    },
    /// Print a completion reply
    Complete {
        #[command(flatten)]
        source: Source,
        /// Cursor offset in bytes (default: end of text)
        #[arg(long)]
        cursor: Option<usize>,
        /// Extra words offered as symbol completions
        #[arg(long, value_delimiter = ',')]
        words: Vec<String>,
    },
    /// Print where an introspection request would be routed
    Inspect {
        #[command(flatten)]
        source: Source,
        /// Cursor offset in bytes (default: end of text)
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Print the detected magic, or null
    Magic {
        #[command(flatten)]
        source: Source,
    },
    /// Print filesystem completions for a partial path
    Paths { fragment: String },
    /// Validate and print the effective parser configuration
    Config,
}

fn load_config(cli: &Cli) -> Result<ParseConfig> {
    match &cli.config {
        Some(path) => ParseConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(match cli.preset {
            Preset::Python => ParseConfig::default(),
            Preset::Lisp => ParseConfig::lisp(),
        }),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_logger(cli.no_color, cli.log_level.as_deref(), cli.log_file)
        .context("Failed to initialize logging")?;

    let config = load_config(&cli)?;
    debug!("Using parser config: {:?}", config);
    let parser = || Parser::new(config.clone()).context("Invalid parser configuration");

    match &cli.command {
        Command::Config => print_json(parser()?.config()),
        Command::Paths { fragment } => print_json(&paths::complete_path(fragment)),
        Command::Analyze { source, start, end } => {
            let code = source.read()?;
            print_json(&parser()?.parse_code(&code, *start, *end))
        }
        Command::Complete { source, cursor, words } => {
            let code = source.read()?;
            let cursor = cursor.unwrap_or(code.len());
            let symbols = StaticSymbols::new(words.iter().cloned());
            let symbols: Option<&dyn SymbolCompleter> =
                if words.is_empty() { None } else { Some(&symbols) };
            let reply = kernel::complete_request(&parser()?, &code, cursor, symbols);
            info!("{} completions", reply.matches.len());
            print_json(&reply)
        }
        Command::Inspect { source, cursor } => {
            let code = source.read()?;
            let cursor = cursor.unwrap_or(code.len());
            print_json(&kernel::inspect_request(&parser()?, &code, cursor))
        }
        Command::Magic { source } => {
            let code = source.read()?;
            print_json(&parser()?.parse_magic(&code))
        }
    }
}
