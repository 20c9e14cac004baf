mod app;
mod commands;
mod config;
mod error;
mod git;
mod logger;
mod tracker;
mod waypoint;

use clap::{Parser, Subcommand};
use tracing::info;

use app::{App, Command};
use config::Config;
use error::{Error, Result};

#[derive(Parser)]
#[command(
    name = "patchtrail",
    version,
    about = "Keep a feature branch in step with the patches on its issue"
)]
struct Cli {
    #[command(subcommand)]
    cmd: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Commit the issue's new patches onto the feature branch
    Update {
        /// Issue number (defaults to the one in the branch name)
        #[arg(long)]
        issue: Option<u64>,
    },
    /// Write a patch and interdiff for the next comment
    Patch {
        /// Issue number (defaults to the one in the branch name)
        #[arg(long)]
        issue: Option<u64>,
    },
    /// Show the issue's patches and which are committed
    Status {
        /// Issue number (defaults to the one in the branch name)
        #[arg(long)]
        issue: Option<u64>,
    },
}

impl CliCommand {
    fn split(&self) -> (Command, Option<u64>) {
        match *self {
            CliCommand::Update { issue } => (Command::Update, issue),
            CliCommand::Patch { issue } => (Command::Patch, issue),
            CliCommand::Status { issue } => (Command::Status, issue),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        tracing::error!("{}", e);

        // Friendlier text for the git errors users hit first
        let message = match &e {
            Error::Git(git_err) => match git_err.code() {
                git2::ErrorCode::NotFound if git_err.class() == git2::ErrorClass::Repository => {
                    "Not a git repository.\n\nRun patchtrail from inside a project clone."
                        .to_string()
                }
                git2::ErrorCode::UnbornBranch => {
                    "Repository has no commits yet.".to_string()
                }
                _ => format!("{}", e),
            },
            _ => format!("{}", e),
        };

        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load()?;
    logger::init(&config.log);
    info!("patchtrail starting");

    let (command, issue) = cli.cmd.split();
    let app = App::new(config)?;
    app.run(command, issue)
}
