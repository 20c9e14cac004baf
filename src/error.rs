use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("Git repository is not clean. Aborting.")]
    DirtyWorkingTree,
    #[error("Can't find a master branch.")]
    NoMasterBranchFound,
    #[error("Could not find a feature branch. Aborting.")]
    FeatureBranchMissing,
    #[error("Detected feature branch {0}, but it is not the current branch. Aborting.")]
    FeatureBranchNotCurrent(String),
    #[error("Nothing to commit: the patch made no changes.")]
    NothingToCommit,
}

pub type Result<T> = std::result::Result<T, Error>;
