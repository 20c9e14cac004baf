use tracing::{info, warn};

use super::branch::FeatureBranch;
use super::message::CommitMessageCodec;
use super::patch::{PatchSequence, PatchSource, PatchWaypoint};
use crate::error::Result;
use crate::git::GitExecutor;
use crate::tracker::IssueTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// The issue has no patches.
    NothingToDo,
    /// Every patch is already committed on the feature branch.
    UpToDate,
    /// All pending patches were committed.
    Applied,
    /// A patch did not apply; see `ReconciliationReport::failed`.
    ApplyFailed,
}

/// A patch that did not apply, with the content the user needs to apply it
/// by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPatch {
    pub waypoint: PatchWaypoint,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub status: ReconcileStatus,
    /// Newly committed waypoints, carrying their new commit SHAs.
    pub applied: Vec<PatchWaypoint>,
    /// The failed waypoint and every pending one after it.
    pub not_applied: Vec<PatchWaypoint>,
    pub failed: Option<FailedPatch>,
    /// Set when local work beyond the last known patch was moved aside.
    pub fork_branch: Option<String>,
}

impl ReconciliationReport {
    fn terminal(status: ReconcileStatus) -> Self {
        Self {
            status,
            applied: Vec::new(),
            not_applied: Vec::new(),
            failed: None,
            fork_branch: None,
        }
    }
}

/// Brings the feature branch up to date with the patch sequence.
pub struct Reconciler<'a> {
    git: &'a dyn GitExecutor,
    tracker: &'a dyn IssueTracker,
    codec: &'a CommitMessageCodec,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        git: &'a dyn GitExecutor,
        tracker: &'a dyn IssueTracker,
        codec: &'a CommitMessageCodec,
    ) -> Self {
        Self { git, tracker, codec }
    }

    /// `base_sha` is the master branch tip: patches apply to its files, and
    /// it is where the feature branch is expected to sit when no patch has
    /// been committed yet.
    pub fn reconcile(
        &self,
        sequence: &PatchSequence,
        feature: &FeatureBranch,
        base_sha: &str,
    ) -> Result<ReconciliationReport> {
        if sequence.is_empty() {
            info!("No patches on the issue");
            return Ok(ReconciliationReport::terminal(ReconcileStatus::NothingToDo));
        }

        let pending: Vec<&PatchWaypoint> = sequence.pending().collect();
        if pending.is_empty() {
            info!("All {} patches already committed", sequence.len());
            return Ok(ReconciliationReport::terminal(ReconcileStatus::UpToDate));
        }

        let expected_tip = sequence
            .last_committed()
            .and_then(|w| w.sha.as_deref())
            .unwrap_or(base_sha);

        // Commits past the last known patch are kept on a new branch before
        // the feature branch goes back to where the patches stack.
        let mut fork_branch = None;
        if feature.sha != expected_tip {
            let name = feature.fork_branch_name();
            warn!(
                "Feature branch tip {} is not the last patch commit {}; keeping it as {}",
                feature.sha, expected_tip, name
            );
            self.git.create_branch(&name, &feature.sha)?;
            self.git.move_branch_pointer(&feature.name, expected_tip)?;
            fork_branch = Some(name);
        }

        // Tracker patches are made against the master branch, so each one
        // is applied to master's files and committed on the feature branch.
        let mut applied = Vec::new();
        for (position, waypoint) in pending.iter().enumerate() {
            let content = self.load_content(waypoint)?;

            self.git.checkout_files(base_sha)?;
            if !self.git.apply_patch(&content)? {
                warn!("Patch {} {} did not apply", waypoint.index, waypoint.filename);
                self.git.checkout_files("HEAD")?;
                // Later patches build on this one, so they are not tried.
                return Ok(ReconciliationReport {
                    status: ReconcileStatus::ApplyFailed,
                    applied,
                    not_applied: pending[position..].iter().map(|w| (*w).clone()).collect(),
                    failed: Some(FailedPatch {
                        waypoint: (*waypoint).clone(),
                        content,
                    }),
                    fork_branch,
                });
            }

            let message = self.codec.encode(&waypoint.marker());
            let sha = self.git.commit(&message, true)?;
            info!("Applied patch {} {} as {}", waypoint.index, waypoint.filename, sha);

            let mut done = (*waypoint).clone();
            done.sha = Some(sha);
            applied.push(done);
        }

        Ok(ReconciliationReport {
            status: ReconcileStatus::Applied,
            applied,
            not_applied: Vec::new(),
            failed: None,
            fork_branch,
        })
    }

    fn load_content(&self, waypoint: &PatchWaypoint) -> Result<Vec<u8>> {
        match &waypoint.source {
            PatchSource::Remote { file_id } => self.tracker.file_content(*file_id),
            PatchSource::Local { content } => Ok(content.clone()),
        }
    }
}
