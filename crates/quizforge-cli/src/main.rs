//! quizforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizforge", version, about = "Multiple-choice test authoring, taking and statistics")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user id (overrides the config file)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example import files
    Init,

    /// Check an import file without writing anything
    Validate {
        /// Path to a .json, .csv or .txt question file
        #[arg(long)]
        file: PathBuf,
    },

    /// Create a test
    CreateTest {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List all tests
    ListTests,

    /// Open or close a test for new attempts
    SetActive {
        test_id: String,

        /// Close the test instead of opening it
        #[arg(long)]
        off: bool,
    },

    /// Create a question group
    CreateGroup {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List your question groups
    ListGroups,

    /// Import questions into a test
    Import {
        /// Target test id
        #[arg(long)]
        test: String,

        /// Path to the question file
        #[arg(long)]
        file: PathBuf,

        /// Format override: json, csv, text (default: by extension)
        #[arg(long)]
        format: Option<String>,
    },

    /// Take a test interactively
    Take {
        /// Test id
        #[arg(long)]
        test: String,
    },

    /// Show your dashboard
    Dashboard,

    /// Statistics for your tests
    Stats {
        /// Output format: text, markdown, html, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to this file instead of stdout (html defaults to the output dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// System-wide overview
    Admin {
        /// Output format: text, markdown, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Export all data, anonymized, as JSON
    Export {
        /// Output directory (default: the configured output dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete an attempt and its answers
    DeleteAttempt { attempt_id: String },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let user = cli.user;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { file } => commands::validate::execute(file),
        Commands::CreateTest { title, description } => {
            commands::tests::create(config, user, title, description).await
        }
        Commands::ListTests => commands::tests::list(config, user).await,
        Commands::SetActive { test_id, off } => {
            commands::tests::set_active(config, user, test_id, !off).await
        }
        Commands::CreateGroup { name, description } => {
            commands::groups::create(config, user, name, description).await
        }
        Commands::ListGroups => commands::groups::list(config, user).await,
        Commands::Import { test, file, format } => {
            commands::import::execute(config, user, test, file, format).await
        }
        Commands::Take { test } => commands::take::execute(config, user, test).await,
        Commands::Dashboard => commands::dashboard::execute(config, user).await,
        Commands::Stats { format, output } => {
            commands::stats::execute(config, user, format, output).await
        }
        Commands::Admin { format } => commands::admin::execute(config, user, format).await,
        Commands::Export { output } => commands::export::execute(config, user, output).await,
        Commands::DeleteAttempt { attempt_id } => {
            commands::admin::delete_attempt(config, user, attempt_id).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
