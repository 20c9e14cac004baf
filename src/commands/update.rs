use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::Workspace;
use crate::error::Result;
use crate::git::short_sha;
use crate::waypoint::{ReconcileStatus, Reconciler, ReconciliationReport};

#[derive(Debug)]
pub struct UpdateOutcome {
    pub report: ReconciliationReport,
    /// Where the patch that did not apply was saved for manual work.
    pub saved_patch: Option<PathBuf>,
}

/// Commits every issue patch not yet on the feature branch.
pub fn run(ws: &Workspace<'_>, issue: Option<u64>) -> Result<UpdateOutcome> {
    let branches = ws.preflight(issue)?;
    let log = ws.log(&branches)?;
    let sequence = ws.sequence(&branches, &log)?;

    let reconciler = Reconciler::new(ws.git, ws.tracker, ws.codec);
    let report = reconciler.reconcile(&sequence, &branches.feature, &branches.master.sha)?;

    let saved_patch = match &report.failed {
        Some(failed) => {
            let path = ws.workdir.join(&failed.waypoint.filename);
            fs::write(&path, &failed.content)?;
            info!("Saved failed patch to {}", path.display());
            Some(path)
        }
        None => None,
    };

    let outcome = UpdateOutcome {
        report,
        saved_patch,
    };
    print(&outcome, &branches.feature.name);
    Ok(outcome)
}

fn print(outcome: &UpdateOutcome, feature: &str) {
    let report = &outcome.report;

    if let Some(fork) = &report.fork_branch {
        println!(
            "Feature branch {} had commits beyond the last patch; they are now on {}.",
            feature, fork
        );
    }

    for waypoint in &report.applied {
        let sha = waypoint.sha.as_deref().map(short_sha).unwrap_or("");
        println!("Applied patch {} {} ({}).", waypoint.index, waypoint.filename, sha);
    }

    match report.status {
        ReconcileStatus::NothingToDo => println!("No patches to apply."),
        ReconcileStatus::UpToDate => println!("Feature branch {} is up to date.", feature),
        ReconcileStatus::Applied => {
            println!("Applied {} patch(es) to {}.", report.applied.len(), feature)
        }
        ReconcileStatus::ApplyFailed => {
            if let Some(failed) = &report.failed {
                println!(
                    "Patch {} {} did not apply.",
                    failed.waypoint.index, failed.waypoint.filename
                );
            }
            if let Some(path) = &outcome.saved_patch {
                println!("It has been saved to {} for you to apply by hand.", path.display());
            }
            let skipped = report.not_applied.len().saturating_sub(1);
            if skipped > 0 {
                println!("{} later patch(es) were not attempted.", skipped);
            }
        }
    }
}
