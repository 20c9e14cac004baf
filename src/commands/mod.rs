pub mod create_patch;
pub mod status;
pub mod update;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::git::{CommitInfo, GitExecutor};
use crate::tracker::IssueTracker;
use crate::waypoint::{CommitMessageCodec, FeatureBranch, MasterBranch, PatchSequence};

/// The collaborators a command works with, borrowed from the app.
pub struct Workspace<'a> {
    pub git: &'a dyn GitExecutor,
    pub tracker: &'a dyn IssueTracker,
    pub codec: &'a CommitMessageCodec,
    /// Where generated and failed patch files are written.
    pub workdir: &'a Path,
}

#[derive(Debug, Clone)]
pub struct Branches {
    pub master: MasterBranch,
    pub feature: FeatureBranch,
}

impl<'a> Workspace<'a> {
    pub fn branches(&self, issue: Option<u64>) -> Result<Branches> {
        let current = self.git.current_branch_name()?;
        let master = MasterBranch::locate(&self.git.reachable_branches()?, current.as_deref())?;
        let feature = FeatureBranch::locate(&self.git.local_branches()?, current.as_deref(), issue)?;
        debug!("Master {} at {}, feature {} at {}", master.name, master.sha, feature.name, feature.sha);
        Ok(Branches { master, feature })
    }

    /// Checks that must pass before a command touches the repository.
    pub fn preflight(&self, issue: Option<u64>) -> Result<Branches> {
        if !self.git.is_clean()? {
            return Err(Error::DirtyWorkingTree);
        }
        let branches = self.branches(issue)?;
        branches.feature.require_current()?;
        Ok(branches)
    }

    /// Feature branch commits since master, newest first.
    pub fn log(&self, branches: &Branches) -> Result<Vec<CommitInfo>> {
        self.git
            .commit_log(&branches.feature.name, Some(&branches.master.name))
    }

    pub fn sequence(&self, branches: &Branches, log: &[CommitInfo]) -> Result<PatchSequence> {
        let attachments = self.tracker.file_attachments(branches.feature.issue_number)?;
        let sequence = PatchSequence::merge(&attachments, log, self.codec);
        info!(
            "Issue {}: {} patches, {} pending",
            branches.feature.issue_number,
            sequence.len(),
            sequence.pending().count()
        );
        Ok(sequence)
    }
}
