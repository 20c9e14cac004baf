use std::collections::HashMap;

use super::Workspace;
use crate::error::Result;
use crate::git::{short_sha, CommitInfo};
use crate::waypoint::{PatchSequence, PatchWaypoint};

/// Prints the branches and every waypoint of the issue. Read only.
pub fn run(ws: &Workspace<'_>, issue: Option<u64>) -> Result<PatchSequence> {
    let branches = ws.branches(issue)?;
    let log = ws.log(&branches)?;
    let sequence = ws.sequence(&branches, &log)?;

    let current = if branches.master.is_current { ", checked out" } else { "" };
    println!(
        "Master branch:  {} at {}{}",
        branches.master.name,
        short_sha(&branches.master.sha),
        current
    );
    let marker = if branches.feature.is_current { "" } else { ", not checked out" };
    println!(
        "Feature branch: {} for issue {}{}",
        branches.feature.name, branches.feature.issue_number, marker
    );

    if sequence.is_empty() {
        println!("No patches.");
        return Ok(sequence);
    }

    let commits: HashMap<&str, &CommitInfo> = log.iter().map(|c| (c.id.as_str(), c)).collect();
    for waypoint in sequence.waypoints() {
        println!("  {}", describe(waypoint, &commits));
    }

    Ok(sequence)
}

fn describe(waypoint: &PatchWaypoint, commits: &HashMap<&str, &CommitInfo>) -> String {
    let state = match waypoint.sha.as_deref() {
        Some(sha) => match commits.get(sha) {
            Some(commit) => format!("{} {} {}", commit.short_id, commit.date(), commit.author),
            None => sha.to_string(),
        },
        None => "pending".to_string(),
    };
    let origin = if waypoint.index.is_local() { " (local)" } else { "" };
    format!("{:<8} {}{}  {}", waypoint.index.to_string(), waypoint.filename, origin, state)
}
