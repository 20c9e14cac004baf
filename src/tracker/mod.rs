mod drupal;

use crate::error::Result;

pub use drupal::DrupalOrg;

/// A file attached to an issue comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_id: u64,
    pub filename: String,
    /// False for files hidden from the issue's file table, such as
    /// screenshots or superseded uploads.
    pub display: bool,
    /// 1-based comment number the file was posted with; 0 for the issue body.
    pub comment_index: u32,
}

/// The remote issue thread the patches live on.
pub trait IssueTracker {
    /// Attachments of `issue`, ordered by comment index.
    fn file_attachments(&self, issue: u64) -> Result<Vec<Attachment>>;

    fn file_content(&self, file_id: u64) -> Result<Vec<u8>>;

    /// Index the next comment on `issue` will get.
    fn next_comment_index(&self, issue: u64) -> Result<u32>;
}
