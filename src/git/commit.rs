use chrono::{Local, TimeZone};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    /// Full message, not just the summary line: markers are matched on it.
    pub message: String,
    pub author: String,
    pub time: i64,
}

impl CommitInfo {
    pub fn from_commit(commit: &git2::Commit) -> Self {
        let id = commit.id().to_string();

        Self {
            short_id: short_sha(&id).to_string(),
            id,
            message: commit.message().unwrap_or("").to_string(),
            author: commit.author().name().unwrap_or("").to_string(),
            time: commit.time().seconds(),
        }
    }

    #[cfg(test)]
    pub fn new(id: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            short_id: short_sha(id).to_string(),
            message: message.to_string(),
            author: String::new(),
            time: 0,
        }
    }

    pub fn date(&self) -> String {
        Local
            .timestamp_opt(self.time, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}

pub fn short_sha(sha: &str) -> &str {
    &sha[..7.min(sha.len())]
}
