use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use grader_core::config::AppConfig;
use grader_core::error::{AppError, ErrorBody, IntakeError};
use grader_core::intake::{SubmissionPayload, UploadedFile};
use grader_core::state::AppState;
use grader_core::utils::contest::ContestTiming;
use grader_core::utils::lookup::available_problems;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "grader",
    author,
    version,
    about = "Grading coordination for a programming contest judge"
)]
struct Cli {
    /// Configuration file, extension optional
    #[arg(long, env = "GRADER_CONFIG", default_value = "config/config")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the database schema and lookup indexes
    InitDb,
    /// Issue (or return the active) test-data assignment
    Assign {
        #[arg(long)]
        user: i32,
        #[arg(long)]
        problem: i32,
        /// Directory to save the assigned input into
        #[arg(long, value_name = "DIR")]
        save_input: Option<PathBuf>,
    },
    /// Remaining submission time for every available problem
    Timeouts {
        #[arg(long)]
        user: i32,
    },
    /// Submit a solution against the current assignment
    Submit {
        #[arg(long)]
        user: i32,
        #[arg(long)]
        problem: Option<i32>,
        /// Source file
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output file produced from the assigned input
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        language: i32,
    },
    /// Grading report of a submission
    Report {
        #[arg(long)]
        viewer: i32,
        #[arg(long)]
        submission: i32,
    },
    /// Compiler output of a submission
    CompilerMessage {
        #[arg(long)]
        viewer: i32,
        #[arg(long)]
        submission: i32,
    },
    /// Score an output file against a solution file
    SelfCheck {
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        solution: PathBuf,
    },
    /// Score an output file against a problem's verifying pair
    Verify {
        #[arg(long)]
        problem: i32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Start a user's personal contest window
    ConfirmStart {
        #[arg(long)]
        user: i32,
    },
}

enum CliError {
    Intake(IntakeError),
    App(AppError),
    Setup(anyhow::Error),
}

impl From<IntakeError> for CliError {
    fn from(err: IntakeError) -> Self {
        CliError::Intake(err)
    }
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        CliError::App(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Setup(err)
    }
}

impl CliError {
    fn body(&self) -> ErrorBody {
        match self {
            CliError::Intake(e) => e.body(),
            CliError::App(e) => e.body(),
            CliError::Setup(e) => ErrorBody {
                code: "SETUP_ERROR",
                message: format!("{e:#}"),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(value) => {
            println!("{}", pretty(&value));
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", pretty(&err.body()));
            ExitCode::FAILURE
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, CliError> {
    Ok(serde_json::to_value(value).context("failed to serialize result")?)
}

async fn read_text(path: &Path) -> Result<String, CliError> {
    Ok(tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?)
}

async fn connect(config_path: &str) -> Result<AppState, CliError> {
    let config = AppConfig::load_from(config_path).context("failed to load configuration")?;
    let db = grader_core::database::init_db(&config.database)
        .await
        .context("failed to connect to database")?;
    Ok(AppState::new(db, config))
}

async fn run(cli: Cli) -> Result<Value, CliError> {
    let now = Utc::now();

    // Pure scoring needs no database.
    if let Commands::SelfCheck { output, solution } = &cli.command {
        return self_check(output, solution).await;
    }

    let state = connect(&cli.config).await?;

    match cli.command {
        Commands::InitDb => {
            grader_core::seed::ensure_indexes(&state.db)
                .await
                .context("failed to create indexes")?;
            info!("Database initialized");
            Ok(json!({ "initialized": true }))
        }
        Commands::Assign {
            user,
            problem,
            save_input,
        } => {
            let assignment = state.assignments.issue_or_get(user, problem, now).await?;
            let mut value = to_json(&assignment)?;
            value["expires_at"] = to_json(&state.assignments.window().expires_at(&assignment))?;

            if let Some(dir) = save_input {
                let file = state.assignments.download_input(user, problem, now).await?;
                let path = dir.join(&file.filename);
                tokio::fs::write(&path, &file.content)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                value["input_file"] = json!(path);
            }
            Ok(value)
        }
        Commands::Timeouts { user } => {
            let problems = available_problems(&state.db).await?;
            let ids: Vec<i32> = problems.iter().map(|p| p.id).collect();
            let timeouts = state
                .assignments
                .submission_timeouts(user, &ids, now)
                .await?;

            let rows: Vec<Value> = problems
                .iter()
                .map(|p| {
                    let remaining = timeouts.get(&p.id).copied().flatten();
                    json!({
                        "problem_id": p.id,
                        "problem": p.name,
                        "remaining_secs": remaining.map(|d| d.num_seconds()),
                    })
                })
                .collect();
            Ok(Value::Array(rows))
        }
        Commands::Submit {
            user,
            problem,
            source,
            output,
            language,
        } => {
            let source = match source {
                Some(path) => Some(UploadedFile {
                    filename: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    content: read_text(&path).await?,
                }),
                None => None,
            };
            let output = match output {
                Some(path) => Some(read_text(&path).await?),
                None => None,
            };
            let payload = SubmissionPayload {
                source,
                output,
                language_id: language,
            };
            let submission = state.intake.accept(user, problem, payload, now).await?;
            to_json(&submission)
        }
        Commands::Report { viewer, submission } => {
            let report = state
                .results
                .report_for(&state.db, viewer, submission)
                .await?;
            to_json(&report)
        }
        Commands::CompilerMessage { viewer, submission } => {
            let message = state
                .results
                .compiler_message(&state.db, viewer, submission)
                .await?;
            Ok(json!({ "submission_id": submission, "compiler_message": message }))
        }
        Commands::Verify { problem, output } => {
            let result = state
                .self_check
                .verify(problem, &read_text(&output).await?)
                .await?;
            to_json(&result)
        }
        Commands::ConfirmStart { user } => {
            state.contest.confirm_start(user, now).await?;
            Ok(json!({
                "user_id": user,
                "requires_confirmation": state.contest.requires_confirmation(user).await?,
            }))
        }
        Commands::SelfCheck { output, solution } => self_check(&output, &solution).await,
    }
}

async fn self_check(output: &Path, solution: &Path) -> Result<Value, CliError> {
    let result = grader_core::selfcheck::score(
        &read_text(output).await?,
        &read_text(solution).await?,
    );
    to_json(&result)
}
