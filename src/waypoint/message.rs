use regex::Regex;

use crate::error::{Error, Result};

/// Workflow data carried in a commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMarker {
    /// The commit applies a patch file downloaded from the tracker.
    RemoteApply {
        filename: String,
        file_id: u64,
        comment_index: u32,
    },
    /// The commit records a patch file made locally for upload.
    LocalRecord { filename: String },
}

/// Writes and reads the two marker message templates.
///
/// ```text
/// Patch from <tracker>. Comment: <n>; file: <filename>; fid <id>. Automatic commit by <tool>.
/// Patch for <tracker>. File: <filename>. Automatic commit by <tool>.
/// ```
#[derive(Debug, Clone)]
pub struct CommitMessageCodec {
    tracker: String,
    tool: String,
    remote_apply: Regex,
    local_record: Regex,
}

impl CommitMessageCodec {
    pub fn new(tracker: &str, tool: &str) -> Result<Self> {
        let t = regex::escape(tracker);
        let by = regex::escape(tool);

        let remote_apply = Regex::new(&format!(
            r"^Patch from {t}\. Comment: (?P<comment>\d+); file: (?P<file>.+?); fid (?P<fid>\d+)\. Automatic commit by {by}\.$"
        ))
        .map_err(|e| Error::Config(format!("marker labels: {}", e)))?;
        let local_record = Regex::new(&format!(
            r"^Patch for {t}\. File: (?P<file>.+?)\. Automatic commit by {by}\.$"
        ))
        .map_err(|e| Error::Config(format!("marker labels: {}", e)))?;

        Ok(Self {
            tracker: tracker.to_string(),
            tool: tool.to_string(),
            remote_apply,
            local_record,
        })
    }

    pub fn encode(&self, marker: &CommitMarker) -> String {
        match marker {
            CommitMarker::RemoteApply {
                filename,
                file_id,
                comment_index,
            } => format!(
                "Patch from {}. Comment: {}; file: {}; fid {}. Automatic commit by {}.",
                self.tracker, comment_index, filename, file_id, self.tool
            ),
            CommitMarker::LocalRecord { filename } => format!(
                "Patch for {}. File: {}. Automatic commit by {}.",
                self.tracker, filename, self.tool
            ),
        }
    }

    /// `None` for any message that isn't one of ours.
    pub fn decode(&self, message: &str) -> Option<CommitMarker> {
        let message = message.trim();

        if let Some(caps) = self.remote_apply.captures(message) {
            return Some(CommitMarker::RemoteApply {
                filename: caps["file"].to_string(),
                file_id: caps["fid"].parse().ok()?,
                comment_index: caps["comment"].parse().ok()?,
            });
        }

        self.local_record
            .captures(message)
            .map(|caps| CommitMarker::LocalRecord {
                filename: caps["file"].to_string(),
            })
    }
}
