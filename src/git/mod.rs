mod commit;
mod repository;

use std::collections::BTreeMap;

use crate::error::Result;

pub use commit::{short_sha, CommitInfo};
pub use repository::Repository;

/// The git operations the workflow needs, with typed arguments.
///
/// `Repository` is the real implementation; tests substitute recording fakes.
pub trait GitExecutor {
    /// True when no tracked file is modified or staged. Untracked files are
    /// ignored, since generated patch files live in the working directory.
    fn is_clean(&self) -> Result<bool>;

    /// All local branches, name to tip SHA.
    fn local_branches(&self) -> Result<BTreeMap<String, String>>;

    /// Local branches whose tip is HEAD or one of its ancestors.
    fn reachable_branches(&self) -> Result<BTreeMap<String, String>>;

    /// `None` on a detached HEAD.
    fn current_branch_name(&self) -> Result<Option<String>>;

    /// Commits on `branch`, newest first, stopping at `exclude` if given.
    fn commit_log(&self, branch: &str, exclude: Option<&str>) -> Result<Vec<CommitInfo>>;

    /// Unified diff from `from_ref` to the working tree.
    fn diff(&self, from_ref: &str) -> Result<Vec<u8>>;

    /// Applies a unified diff to the working tree and index. Returns false
    /// when the patch does not apply; the tree is left untouched then.
    fn apply_patch(&self, patch: &[u8]) -> Result<bool>;

    /// Commits the index on the current branch and returns the new SHA.
    fn commit(&self, message: &str, allow_empty: bool) -> Result<String>;

    fn create_branch(&self, name: &str, at: &str) -> Result<()>;

    /// Points `name` at `to`. When `name` is checked out the working tree
    /// follows it.
    fn move_branch_pointer(&self, name: &str, to: &str) -> Result<()>;

    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Makes the index and working tree match `rev` without moving HEAD.
    fn checkout_files(&self, rev: &str) -> Result<()>;

    /// Directory name of the working tree, used as the project name.
    fn project_name(&self) -> String;
}
