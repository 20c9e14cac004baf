use std::fmt;

use tracing::{debug, trace};

use super::message::{CommitMarker, CommitMessageCodec};
use crate::git::CommitInfo;
use crate::tracker::Attachment;

/// Position of a waypoint in the patch history.
///
/// Remote patches sit at `(comment, 0, file)`, where `file` orders several
/// patches posted with one comment. Local-only patches sit at
/// `(anchor, n, 0)`: after the highest remote comment committed before them,
/// with `n` counting up across all local patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceIndex {
    pub comment: u32,
    pub synthetic: u32,
    pub file: u32,
}

impl SequenceIndex {
    pub fn remote(comment: u32) -> Self {
        Self {
            comment,
            synthetic: 0,
            file: 0,
        }
    }

    pub fn is_local(&self) -> bool {
        self.synthetic > 0
    }
}

impl fmt::Display for SequenceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "#{}+{}", self.comment, self.synthetic)
        } else if self.file > 0 {
            write!(f, "#{}.{}", self.comment, self.file)
        } else {
            write!(f, "#{}", self.comment)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    /// Content is downloaded from the tracker when needed.
    Remote { file_id: u64 },
    Local { content: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchWaypoint {
    pub index: SequenceIndex,
    pub filename: String,
    /// Commit on the feature branch holding this patch, if any.
    pub sha: Option<String>,
    pub source: PatchSource,
}

impl PatchWaypoint {
    pub fn is_committed(&self) -> bool {
        self.sha.is_some()
    }

    pub fn file_id(&self) -> Option<u64> {
        match self.source {
            PatchSource::Remote { file_id } => Some(file_id),
            PatchSource::Local { .. } => None,
        }
    }

    /// Marker to record when this patch gets committed.
    pub fn marker(&self) -> CommitMarker {
        match self.source {
            PatchSource::Remote { file_id } => CommitMarker::RemoteApply {
                filename: self.filename.clone(),
                file_id,
                comment_index: self.index.comment,
            },
            PatchSource::Local { .. } => CommitMarker::LocalRecord {
                filename: self.filename.clone(),
            },
        }
    }
}

fn is_patch_file(filename: &str) -> bool {
    filename.ends_with(".patch") || filename.ends_with(".diff")
}

/// Remote and local patches in one ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSequence {
    waypoints: Vec<PatchWaypoint>,
}

impl PatchSequence {
    /// Builds the sequence from the issue's attachments and the feature
    /// branch log (newest first).
    pub fn merge(attachments: &[Attachment], log: &[CommitInfo], codec: &CommitMessageCodec) -> Self {
        let mut waypoints: Vec<PatchWaypoint> = Vec::new();
        let mut last_comment = None;
        let mut file = 0;

        let mut eligible: Vec<&Attachment> = attachments
            .iter()
            .filter(|a| {
                let keep = a.display && is_patch_file(&a.filename);
                if !keep {
                    trace!("Skipping attachment {}", a.filename);
                }
                keep
            })
            .collect();
        eligible.sort_by_key(|a| a.comment_index);

        for attachment in eligible {
            file = if last_comment == Some(attachment.comment_index) { file + 1 } else { 0 };
            last_comment = Some(attachment.comment_index);

            waypoints.push(PatchWaypoint {
                index: SequenceIndex {
                    comment: attachment.comment_index,
                    synthetic: 0,
                    file,
                },
                filename: attachment.filename.clone(),
                sha: None,
                source: PatchSource::Remote {
                    file_id: attachment.file_id,
                },
            });
        }

        let mut anchor = 0;
        let mut synthetic = 0;
        let mut local = Vec::new();

        for commit in log.iter().rev() {
            let marker = match codec.decode(&commit.message) {
                Some(m) => m,
                None => continue,
            };

            match marker {
                CommitMarker::RemoteApply { file_id, .. } => {
                    match waypoints.iter_mut().find(|w| w.file_id() == Some(file_id)) {
                        Some(waypoint) => {
                            waypoint.sha = Some(commit.id.clone());
                            anchor = anchor.max(waypoint.index.comment);
                        }
                        None => debug!("Commit {} applies unknown file {}", commit.short_id, file_id),
                    }
                }
                CommitMarker::LocalRecord { filename } => {
                    let uploaded = waypoints
                        .iter_mut()
                        .find(|w| !w.is_committed() && w.filename == filename);

                    match uploaded {
                        Some(waypoint) => {
                            waypoint.sha = Some(commit.id.clone());
                            anchor = anchor.max(waypoint.index.comment);
                        }
                        None => {
                            synthetic += 1;
                            local.push(PatchWaypoint {
                                index: SequenceIndex {
                                    comment: anchor,
                                    synthetic,
                                    file: 0,
                                },
                                filename,
                                sha: Some(commit.id.clone()),
                                source: PatchSource::Local { content: Vec::new() },
                            });
                        }
                    }
                }
            }
        }

        waypoints.extend(local);
        waypoints.sort_by_key(|w| w.index);
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[PatchWaypoint] {
        &self.waypoints
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PatchWaypoint> {
        self.waypoints.iter().filter(|w| !w.is_committed())
    }

    /// The committed waypoint with the highest index; the feature branch tip
    /// is expected to be its commit.
    pub fn last_committed(&self) -> Option<&PatchWaypoint> {
        self.waypoints.iter().rev().find(|w| w.is_committed())
    }

    /// The committed waypoint with the highest index below `index`.
    pub fn last_committed_before(&self, index: SequenceIndex) -> Option<&PatchWaypoint> {
        self.waypoints
            .iter()
            .rev()
            .find(|w| w.is_committed() && w.index < index)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn codec() -> CommitMessageCodec {
        CommitMessageCodec::new("Drupal.org", "patchtrail").unwrap()
    }

    pub(crate) fn attachment(file_id: u64, filename: &str, comment_index: u32) -> Attachment {
        Attachment {
            file_id,
            filename: filename.to_string(),
            display: true,
            comment_index,
        }
    }

    fn remote_commit(id: &str, file_id: u64, filename: &str, comment_index: u32) -> CommitInfo {
        let message = codec().encode(&CommitMarker::RemoteApply {
            filename: filename.to_string(),
            file_id,
            comment_index,
        });
        CommitInfo::new(id, &message)
    }

    fn local_commit(id: &str, filename: &str) -> CommitInfo {
        let message = codec().encode(&CommitMarker::LocalRecord {
            filename: filename.to_string(),
        });
        CommitInfo::new(id, &message)
    }

    fn indexes(sequence: &PatchSequence) -> Vec<String> {
        sequence.waypoints().iter().map(|w| w.index.to_string()).collect()
    }

    #[test]
    fn test_only_displayed_patch_files_become_waypoints() {
        let mut hidden = attachment(2, "old.patch", 2);
        hidden.display = false;
        let attachments = vec![
            attachment(1, "first.patch", 1),
            hidden,
            attachment(3, "screenshot.png", 3),
            attachment(4, "second.patch", 4),
            attachment(5, "interdiff.txt", 4),
        ];

        let sequence = PatchSequence::merge(&attachments, &[], &codec());
        let names: Vec<&str> = sequence.waypoints().iter().map(|w| w.filename.as_str()).collect();
        assert_eq!(names, vec!["first.patch", "second.patch"]);
        assert_eq!(sequence.pending().count(), 2);
        assert!(sequence.last_committed().is_none());
    }

    #[test]
    fn test_commits_mark_remote_waypoints_by_file_id() {
        let attachments = vec![
            attachment(10, "a.patch", 1),
            attachment(11, "b.patch", 3),
            attachment(12, "c.patch", 5),
        ];
        let log = vec![
            CommitInfo::new("ccc", "Unrelated work."),
            remote_commit("bbb", 11, "b.patch", 3),
            remote_commit("aaa", 10, "a.patch", 1),
        ];

        let sequence = PatchSequence::merge(&attachments, &log, &codec());
        let shas: Vec<Option<&str>> = sequence.waypoints().iter().map(|w| w.sha.as_deref()).collect();
        assert_eq!(shas, vec![Some("aaa"), Some("bbb"), None]);
        assert_eq!(sequence.last_committed().unwrap().filename, "b.patch");
        assert_eq!(sequence.pending().next().unwrap().filename, "c.patch");
    }

    #[test]
    fn test_newest_commit_wins_for_repeated_file() {
        let attachments = vec![attachment(10, "a.patch", 1)];
        let log = vec![
            remote_commit("new", 10, "a.patch", 1),
            remote_commit("old", 10, "a.patch", 1),
        ];
        let sequence = PatchSequence::merge(&attachments, &log, &codec());
        assert_eq!(sequence.waypoints()[0].sha.as_deref(), Some("new"));
    }

    #[test]
    fn test_local_records_follow_the_remote_patch_before_them() {
        let attachments = vec![
            attachment(10, "a.patch", 1),
            attachment(11, "b.patch", 4),
            attachment(12, "c.patch", 6),
        ];
        // Oldest last: a, local-1, b, local-2, local-3.
        let log = vec![
            local_commit("l3", "123-7.mod.x.patch"),
            local_commit("l2", "123-6.mod.x.patch"),
            remote_commit("bbb", 11, "b.patch", 4),
            local_commit("l1", "123-2.mod.x.patch"),
            remote_commit("aaa", 10, "a.patch", 1),
        ];

        let sequence = PatchSequence::merge(&attachments, &log, &codec());
        assert_eq!(indexes(&sequence), vec!["#1", "#1+1", "#4", "#4+2", "#4+3", "#6"]);
        assert_eq!(sequence.last_committed().unwrap().sha.as_deref(), Some("l3"));
        assert!(sequence.waypoints()[1].index.is_local());
        assert_eq!(
            sequence.waypoints()[1].source,
            PatchSource::Local { content: Vec::new() }
        );
    }

    #[test]
    fn test_local_record_of_uploaded_patch_commits_remote_waypoint() {
        let attachments = vec![
            attachment(10, "123-1.mod.x.patch", 1),
            attachment(11, "123-2.mod.x.patch", 2),
        ];
        let log = vec![
            local_commit("rec", "123-2.mod.x.patch"),
            remote_commit("aaa", 10, "123-1.mod.x.patch", 1),
        ];

        let sequence = PatchSequence::merge(&attachments, &log, &codec());
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.waypoints()[1].sha.as_deref(), Some("rec"));
        assert_eq!(sequence.pending().count(), 0);
    }

    #[test]
    fn test_several_patches_on_one_comment() {
        let attachments = vec![
            attachment(10, "a-d7.patch", 3),
            attachment(11, "a-d8.patch", 3),
            attachment(12, "b.patch", 4),
        ];
        let sequence = PatchSequence::merge(&attachments, &[], &codec());
        assert_eq!(indexes(&sequence), vec!["#3", "#3.1", "#4"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let attachments = vec![attachment(10, "a.patch", 1), attachment(11, "b.patch", 2)];
        let log = vec![
            local_commit("l1", "local.patch"),
            remote_commit("aaa", 10, "a.patch", 1),
        ];
        let first = PatchSequence::merge(&attachments, &log, &codec());
        let second = PatchSequence::merge(&attachments, &log, &codec());
        assert_eq!(first, second);
    }

    #[test]
    fn test_last_committed_before() {
        let attachments = vec![attachment(10, "a.patch", 1), attachment(11, "b.patch", 3)];
        let log = vec![
            remote_commit("bbb", 11, "b.patch", 3),
            remote_commit("aaa", 10, "a.patch", 1),
        ];
        let sequence = PatchSequence::merge(&attachments, &log, &codec());

        assert_eq!(
            sequence.last_committed_before(SequenceIndex::remote(3)).unwrap().sha.as_deref(),
            Some("aaa")
        );
        assert_eq!(
            sequence.last_committed_before(SequenceIndex::remote(4)).unwrap().sha.as_deref(),
            Some("bbb")
        );
        assert!(sequence.last_committed_before(SequenceIndex::remote(1)).is_none());
    }
}
