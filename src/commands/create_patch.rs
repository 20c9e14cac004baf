use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use super::Workspace;
use crate::error::Result;
use crate::git::short_sha;
use crate::waypoint::{interdiff_base, interdiff_filename, patch_filename, CommitMarker};

#[derive(Debug)]
pub struct CreatedPatch {
    pub patch: PathBuf,
    pub interdiff: Option<PathBuf>,
    /// The empty commit recording that the patch was made.
    pub record_sha: String,
}

/// Writes the patch for the next comment, and an interdiff against the
/// previous waypoint, then records the patch on the feature branch.
pub fn run(ws: &Workspace<'_>, issue: Option<u64>) -> Result<CreatedPatch> {
    let branches = ws.preflight(issue)?;
    let feature = &branches.feature;

    let next_comment = ws.tracker.next_comment_index(feature.issue_number)?;
    let filename = patch_filename(
        feature.issue_number,
        next_comment,
        &ws.git.project_name(),
        &feature.description,
    );

    let diff = ws.git.diff(&branches.master.name)?;
    if diff.is_empty() {
        warn!("Feature branch {} has no changes against {}", feature.name, branches.master.name);
    }
    let patch = ws.workdir.join(&filename);
    fs::write(&patch, &diff)?;
    println!(
        "Written patch {} with diff from {} to local branch.",
        filename, branches.master.name
    );

    let log = ws.log(&branches)?;
    let sequence = ws.sequence(&branches, &log)?;
    let interdiff = match interdiff_base(&sequence, next_comment) {
        Some(base) => {
            let name = interdiff_filename(feature.issue_number, next_comment);
            let path = ws.workdir.join(&name);
            fs::write(&path, ws.git.diff(base)?)?;
            println!("Written interdiff {} from {} to local branch.", name, short_sha(base));
            Some(path)
        }
        None => {
            info!("No earlier patch to diff against; skipping interdiff");
            None
        }
    };

    let message = ws.codec.encode(&CommitMarker::LocalRecord { filename });
    let record_sha = ws.git.commit(&message, true)?;
    info!("Recorded patch as {}", record_sha);

    Ok(CreatedPatch {
        patch,
        interdiff,
        record_sha,
    })
}
