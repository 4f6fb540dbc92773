//! parlance CLI - Translate questions into SQL
//!
//! Usage:
//!   parlance interpret "<sentence>" [--catalog <file>] [--sqlite] [--demo] [--format <format>]
//!   parlance tokens "<sentence>"
//!   parlance import <catalog.toml> <catalog.db>
//!
//! Examples:
//!   parlance interpret "sales in 1997" --demo
//!   parlance interpret "average revenue by city" --catalog foodmart.db --sqlite --format tree
//!   parlance import foodmart.toml foodmart.db

use clap::{Parser, Subcommand, ValueEnum};
use parlance::catalog::{sample, Catalog, CatalogSpec, SqliteCatalog};
use parlance::config::CatalogDriver;
use parlance::{InterpretService, Interpreter, Settings, NO_QUERY};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parlance")]
#[command(about = "parlance - Translate natural-language questions into analytical SQL")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to $PARLANCE_CONFIG, ./parlance.toml, ~/.config/parlance)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret a sentence
    Interpret {
        sentence: String,

        /// Catalog file (TOML description, or SQLite with --sqlite)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Read the catalog file as a SQLite database
        #[arg(long)]
        sqlite: bool,

        /// Use the built-in sample warehouse
        #[arg(long, conflicts_with = "catalog")]
        demo: bool,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        format: OutputFormat,
    },

    /// Show the cleaned tokens of a sentence
    Tokens { sentence: String },

    /// Write a TOML warehouse description into a SQLite catalog
    Import {
        /// TOML description
        catalog: PathBuf,

        /// SQLite database, created if missing
        database: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// SQL only
    Sql,
    /// QUERY tree with diagnostics
    Tree,
    /// measure\group-by\selection summary
    Parts,
    /// Full result as JSON
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Interpret {
            sentence,
            catalog,
            sqlite,
            demo,
            format,
        } => cmd_interpret(&settings, &sentence, catalog, sqlite, demo, format).await,
        Commands::Tokens { sentence } => cmd_tokens(&settings, &sentence),
        Commands::Import { catalog, database } => cmd_import(catalog, database),
    }
}

fn open_catalog(
    settings: &Settings,
    catalog: Option<PathBuf>,
    sqlite: bool,
    demo: bool,
) -> Result<Arc<dyn Catalog>, String> {
    if demo {
        return sample::foodmart()
            .map(|c| Arc::new(c) as Arc<dyn Catalog>)
            .map_err(|e| e.to_string());
    }
    let Some(path) = catalog else {
        return settings.catalog.open().map_err(|e| e.to_string());
    };
    let driver = if sqlite {
        CatalogDriver::Sqlite
    } else {
        CatalogDriver::Toml
    };
    settings
        .catalog
        .open_at(driver, &path)
        .map_err(|e| format!("'{}': {}", path.display(), e))
}

async fn cmd_interpret(
    settings: &Settings,
    sentence: &str,
    catalog: Option<PathBuf>,
    sqlite: bool,
    demo: bool,
    format: OutputFormat,
) -> ExitCode {
    let catalog = match open_catalog(settings, catalog, sqlite, demo) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error opening catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let interpreter = Interpreter::new(catalog, settings.interpret.clone());
    let service = InterpretService::new(Arc::new(interpreter), settings.service.timeout());

    let compiled = match service.interpret(sentence).await {
        Ok(Some(compiled)) => compiled,
        Ok(None) => {
            println!("{}", NO_QUERY);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Interpretation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match format {
        OutputFormat::Sql => println!("{}", compiled.sql()),
        OutputFormat::Tree => {
            println!("{}", compiled.tree());
            for diagnostic in compiled.diagnostics() {
                println!("  {}", diagnostic);
            }
        }
        OutputFormat::Parts => println!("{}", compiled.parts()),
        OutputFormat::Json => match serde_json::to_string_pretty(&compiled) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing result: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_tokens(settings: &Settings, sentence: &str) -> ExitCode {
    let stop_words = settings.interpret.stop_word_set();
    let tokens =
        parlance::segment::clean_sentence(sentence, &stop_words, settings.interpret.skip_cleaning);
    for (i, token) in tokens.iter().enumerate() {
        println!("{:>3}  {}", i, token);
    }
    ExitCode::SUCCESS
}

fn cmd_import(catalog: PathBuf, database: PathBuf) -> ExitCode {
    let spec = match CatalogSpec::from_file(&catalog) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {}", catalog.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let imported = SqliteCatalog::create(&database).and_then(|db| db.import(&spec));
    match imported {
        Ok(()) => {
            println!("Imported {} into {}", catalog.display(), database.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Import error: {}", e);
            ExitCode::FAILURE
        }
    }
}
