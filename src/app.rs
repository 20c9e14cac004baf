use tracing::info;

use crate::commands::{create_patch, status, update, Workspace};
use crate::config::Config;
use crate::error::Result;
use crate::git::Repository;
use crate::tracker::DrupalOrg;
use crate::waypoint::CommitMessageCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Update,
    Patch,
    Status,
}

/// Owns the real collaborators and hands them to the commands.
pub struct App {
    pub repo: Repository,
    pub tracker: DrupalOrg,
    pub codec: CommitMessageCodec,
    pub config: Config,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let repo = Repository::discover()?;
        let tracker = DrupalOrg::new(&config.tracker);
        let codec = CommitMessageCodec::new(&config.tracker.label, &config.marker.tool)?;

        Ok(Self {
            repo,
            tracker,
            codec,
            config,
        })
    }

    fn workspace(&self) -> Workspace<'_> {
        Workspace {
            git: &self.repo,
            tracker: &self.tracker,
            codec: &self.codec,
            workdir: self.repo.path(),
        }
    }

    pub fn run(&self, command: Command, issue: Option<u64>) -> Result<()> {
        info!(
            "Running {:?} in {} against {}",
            command,
            self.repo.path().display(),
            self.config.tracker.base_url
        );
        let ws = self.workspace();

        match command {
            Command::Update => {
                let outcome = update::run(&ws, issue)?;
                info!("Update finished: {:?}", outcome.report.status);
            }
            Command::Patch => {
                let created = create_patch::run(&ws, issue)?;
                info!(
                    "Wrote {} (interdiff {:?}), recorded as {}",
                    created.patch.display(),
                    created.interdiff,
                    created.record_sha
                );
            }
            Command::Status => {
                status::run(&ws, issue)?;
            }
        }
        Ok(())
    }
}
