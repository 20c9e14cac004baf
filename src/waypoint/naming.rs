use super::patch::{PatchSequence, SequenceIndex};

/// `<issue>-<comment>.<project>.<description>.patch`, the name the next
/// upload will carry.
pub fn patch_filename(issue: u64, next_comment: u32, project: &str, description: &str) -> String {
    format!("{}-{}.{}.{}.patch", issue, next_comment, project, description)
}

pub fn interdiff_filename(issue: u64, next_comment: u32) -> String {
    format!("interdiff.{}.{}.txt", issue, next_comment)
}

/// Commit an interdiff for the patch about to be posted at `next_comment`
/// should start from: the latest committed waypoint before it. `None` means
/// there is nothing to diff against.
pub fn interdiff_base(sequence: &PatchSequence, next_comment: u32) -> Option<&str> {
    sequence
        .last_committed_before(SequenceIndex::remote(next_comment))
        .and_then(|w| w.sha.as_deref())
}
