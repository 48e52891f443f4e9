//! quizmaster: define tests, import questions, run timed sessions.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use services::{AppServices, Clock};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::manage::TestFields;

#[derive(Parser)]
#[command(name = "quizmaster", version, about = "Timed multiple-choice tests from plain text")]
struct Cli {
    /// SQLite URL or file path (default: $QUIZ_DB_URL, then ./quiz.sqlite3)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a test, or update the one with this name
    Save {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Questions drawn per session
        #[arg(long, default_value = "10")]
        sample_size: u32,

        /// Time limit in seconds
        #[arg(long, default_value = "300")]
        time_limit: u32,
    },

    /// Replace a test's questions with those in a text file
    Import {
        /// UTF-8 file with <question>/<variant> blocks
        #[arg(long)]
        file: PathBuf,

        /// Existing test id or name
        #[arg(long, conflicts_with = "name")]
        test: Option<String>,

        /// Create or update the test with this name before importing
        #[arg(long)]
        name: Option<String>,

        #[arg(long, requires = "name")]
        description: Option<String>,

        #[arg(long, default_value = "10")]
        sample_size: u32,

        #[arg(long, default_value = "300")]
        time_limit: u32,
    },

    /// List tests
    List {
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, default_value = "0")]
        offset: u32,
    },

    /// Find tests by name or description
    Search {
        query: String,

        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Rename a test
    Rename {
        /// Test id or name
        #[arg(long)]
        test: String,

        new_name: String,
    },

    /// Delete a test with its questions and results
    Delete {
        /// Test id or name
        #[arg(long)]
        test: String,
    },

    /// Take a test interactively
    Take {
        /// Test id or name
        #[arg(long)]
        test: String,

        #[arg(long)]
        examinee: String,

        #[arg(long)]
        group: Option<String>,

        /// Seed for question and answer order
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show recorded results, newest first
    Results {
        /// Test id or name
        #[arg(long, conflicts_with = "examinee")]
        test: Option<String>,

        #[arg(long)]
        examinee: Option<String>,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = config::resolve_db_url(cli.db)?;
    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    config::prepare_sqlite_file(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default_clock()).await?;
    tracing::debug!("using database {db_url}");

    match cli.command {
        Commands::Save {
            name,
            description,
            sample_size,
            time_limit,
        } => {
            let fields = TestFields {
                name,
                description,
                sample_size,
                time_limit,
            };
            commands::manage::save(&app, fields).await
        }
        Commands::Import {
            file,
            test,
            name,
            description,
            sample_size,
            time_limit,
        } => {
            let fields = name.map(|name| TestFields {
                name,
                description,
                sample_size,
                time_limit,
            });
            commands::manage::import(&app, &file, test.as_deref(), fields).await
        }
        Commands::List { limit, offset } => commands::manage::list(&app, limit, offset).await,
        Commands::Search { query, limit } => commands::manage::search(&app, &query, limit).await,
        Commands::Rename { test, new_name } => {
            commands::manage::rename(&app, &test, &new_name).await
        }
        Commands::Delete { test } => commands::manage::delete(&app, &test).await,
        Commands::Take {
            test,
            examinee,
            group,
            seed,
        } => {
            let app = match seed {
                Some(seed) => app.with_session_seed(seed),
                None => app,
            };
            commands::take::execute(&app, &test, &examinee, group).await
        }
        Commands::Results { test, examinee } => {
            commands::results::execute(&app, test.as_deref(), examinee.as_deref()).await
        }
    }
}

/// `RUST_LOG` when set, otherwise info for this binary and the services.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quizmaster=info,services=info"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("Error: {err:#}");
        process::exit(2);
    }
}
