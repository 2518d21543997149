//! gym - Personal gym workout log
//!
//! gym add "жим лёжа" 80kg 8reps 3sets
//! gym log присед 100кг 5x4 колено ныло
//! gym max "жим лёжа"

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gymlog::db::Database;
use gymlog::exercise::Exercise;
use gymlog::intent::{DEFAULT_PROGRESS_DAYS, Intent};
use gymlog::parser::{parse_entry, parse_sets};
use gymlog::report;
use gymlog::tui::App;
use gymlog::voice::{OpenAiClient, VoiceError};

#[derive(Parser)]
#[command(name = "gym")]
#[command(author, version, about = "Дневник тренировок в зале")]
struct Cli {
    /// Database file (default: ~/.gym/gym.db)
    #[arg(long, global = true, env = "GYM_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an exercise: gym add "жим лёжа" 80kg 8x3
    Add {
        /// Exercise name (quote it if it has spaces)
        name: String,

        /// Weight, reps and sets: "80kg 8reps 3sets", "80kg 8x3", "80 8 3"
        #[arg(required = true, num_args = 1..)]
        params: Vec<String>,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Add a free-form entry: gym log жим лежа 80 8x3 легко
    Log {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show today's exercises
    Today,

    /// Show the max weight for an exercise
    Max { name: String },

    /// Show the last record of an exercise
    Last { name: String },

    /// Show progress for an exercise
    Progress {
        name: String,

        /// Window in days
        #[arg(short, long, default_value_t = DEFAULT_PROGRESS_DAYS)]
        days: i64,
    },

    /// Delete a record by id
    Delete { id: i64 },

    /// List all exercise names
    Names,

    /// Open TUI dashboard
    Tui,

    /// Start Telegram bot
    Bot {
        /// Telegram bot token (or set TELOXIDE_TOKEN env var)
        #[arg(short, long, env = "TELOXIDE_TOKEN")]
        token: String,
    },
}

fn default_db_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".gym").join("gym.db"))
        .unwrap_or_else(|| PathBuf::from("gym.db"))
}

/// Print a user-facing error and signal failure
fn fail(message: impl std::fmt::Display) -> Result<ExitCode> {
    eprintln!("Ошибка: {}", message);
    Ok(ExitCode::FAILURE)
}

fn run_intent(db: &Database, intent: Intent) -> Result<ExitCode> {
    let outcome = intent.execute(db)?;
    println!("{}", report::render(&outcome));
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(default_db_path);
    let db = Database::open(&db_path)?;

    match cli.command {
        Some(Commands::Add { name, params, note }) => {
            let load = match parse_sets(&params.join(" ")) {
                Ok(load) => load,
                Err(e) => return fail(e),
            };
            match Exercise::new(name, load.weight, load.reps, load.sets, note, Utc::now()) {
                Ok(exercise) => run_intent(&db, Intent::Add(exercise)),
                Err(e) => fail(e),
            }
        }

        Some(Commands::Log { text }) => match parse_entry(&text.join(" ")) {
            Ok(exercise) => run_intent(&db, Intent::Add(exercise)),
            Err(e) => fail(e),
        },

        Some(Commands::Today) => run_intent(&db, Intent::Today),

        Some(Commands::Max { name }) => run_intent(&db, Intent::Max { name }),

        Some(Commands::Last { name }) => run_intent(&db, Intent::Last { name }),

        Some(Commands::Progress { name, days }) => {
            if days <= 0 {
                return fail(format!("количество дней должно быть положительным: {}", days));
            }
            run_intent(&db, Intent::Progress { name, days })
        }

        Some(Commands::Delete { id }) => {
            if db.delete(id)? {
                println!("Запись {} удалена", id);
                Ok(ExitCode::SUCCESS)
            } else {
                fail(format!("запись {} не найдена", id))
            }
        }

        Some(Commands::Names) => {
            println!("{}", report::render_names(&db.all_names()?));
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::Bot { token }) => {
            let voice = match OpenAiClient::from_env() {
                Ok(client) => Some(client),
                Err(VoiceError::MissingApiKey) => None,
                Err(e) => return Err(e.into()),
            };
            println!("Starting Telegram bot...");
            println!("База данных: {}", db_path.display());
            gymlog::bot::run_bot(token, db, voice).await?;
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::Tui) | None => {
            let mut app = App::new(db)?;
            app.run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
