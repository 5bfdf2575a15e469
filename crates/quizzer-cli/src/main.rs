//! quizzer CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quizzer",
    version,
    about = "Grounded quiz generation and grading from course notes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive quiz session
    Quiz {
        /// Username to run the session as
        #[arg(long)]
        user: String,

        /// Course identifier (a subdirectory of the courses root)
        #[arg(long)]
        course: String,

        /// Number of questions in the session
        #[arg(long, default_value = "5")]
        questions: u32,

        /// Question types to draw from (comma-separated:
        /// single_choice, multi_choice, short_answer, long_answer)
        #[arg(long, default_value = "short_answer")]
        types: String,

        /// Restrict questions to passages matching a topic
        #[arg(long)]
        topic: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Register a new user account
    Register {
        /// Username to create
        #[arg(long)]
        user: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a user's statistics and rating
    Profile {
        /// Username to look up
        #[arg(long)]
        user: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List courses and whether they have readable material
    Courses {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check that the configured model endpoint is reachable
    Check {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config file and courses directory
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizzer=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Quiz {
            user,
            course,
            questions,
            types,
            topic,
            config,
        } => commands::quiz::execute(user, course, questions, types, topic, config).await,
        Commands::Register { user, config } => commands::register::execute(user, config),
        Commands::Profile { user, config } => commands::profile::execute(user, config),
        Commands::Courses { config } => commands::courses::execute(config),
        Commands::Check { config } => commands::check::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
