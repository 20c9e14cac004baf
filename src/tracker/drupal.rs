use std::cell::RefCell;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use super::{Attachment, IssueTracker};
use crate::config::TrackerConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("patchtrail/", env!("CARGO_PKG_VERSION"));

/// Client for the Drupal.org `api-d7` REST endpoints.
pub struct DrupalOrg {
    agent: ureq::Agent,
    base_url: String,
    /// File URLs seen while listing attachments, so content fetches skip the
    /// file entity lookup.
    file_urls: RefCell<HashMap<u64, String>>,
}

// Drupal.org serializes most numbers and flags as strings.

#[derive(Debug, Deserialize)]
struct IssueNode {
    #[serde(default)]
    field_issue_files: Vec<IssueFileItem>,
    #[serde(default)]
    comments: Vec<EntityRef>,
    #[serde(default, deserialize_with = "de_number")]
    comment_count: u64,
}

#[derive(Debug, Deserialize)]
struct IssueFileItem {
    file: FileRef,
    #[serde(default, deserialize_with = "de_flag")]
    display: bool,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    #[serde(deserialize_with = "de_number")]
    id: u64,
    #[serde(default, deserialize_with = "de_number")]
    cid: u64,
}

#[derive(Debug, Deserialize)]
struct EntityRef {
    #[serde(deserialize_with = "de_number")]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct FileEntity {
    url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Number(u64),
    Text(String),
}

fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Number(n) => Ok(n),
        Loose::Text(s) if s.trim().is_empty() => Ok(0),
        Loose::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Loose::Bool(b) => Err(serde::de::Error::custom(format!("expected a number, got {}", b))),
    }
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => b,
        Loose::Number(n) => n != 0,
        Loose::Text(s) => matches!(s.trim(), "1" | "true"),
    })
}

impl IssueNode {
    /// (file id, display, comment index) for each file, in comment order.
    fn files(&self) -> Vec<(u64, bool, u32)> {
        let mut files: Vec<(u64, bool, u32)> = self
            .field_issue_files
            .iter()
            .map(|item| {
                let index = self
                    .comments
                    .iter()
                    .position(|c| c.id == item.file.cid)
                    .map(|pos| pos as u32 + 1)
                    .unwrap_or(0);
                (item.file.id, item.display, index)
            })
            .collect();
        files.sort_by_key(|&(_, _, index)| index);
        files
    }

    fn next_comment_index(&self) -> u32 {
        self.comment_count as u32 + 1
    }
}

fn filename_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

impl DrupalOrg {
    pub fn new(config: &TrackerConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .new_agent();

        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            file_urls: RefCell::new(HashMap::new()),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>> {
        debug!("GET {}", url);
        Ok(self.agent.get(url).header("User-Agent", USER_AGENT).call()?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/api-d7/{}", self.base_url, path);
        let body = self.get(&url)?.body_mut().read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn issue_node(&self, issue: u64) -> Result<IssueNode> {
        self.get_json(&format!("node/{}.json", issue))
    }

    fn file_url(&self, file_id: u64) -> Result<String> {
        if let Some(url) = self.file_urls.borrow().get(&file_id) {
            return Ok(url.clone());
        }

        let entity: FileEntity = self.get_json(&format!("file/{}.json", file_id))?;
        if entity.url.is_empty() {
            return Err(Error::Tracker(format!("file {} has no download URL", file_id)));
        }
        self.file_urls.borrow_mut().insert(file_id, entity.url.clone());
        Ok(entity.url)
    }
}

impl IssueTracker for DrupalOrg {
    fn file_attachments(&self, issue: u64) -> Result<Vec<Attachment>> {
        let node = self.issue_node(issue)?;

        let mut attachments = Vec::new();
        for (file_id, display, comment_index) in node.files() {
            let url = self.file_url(file_id)?;
            attachments.push(Attachment {
                file_id,
                filename: filename_from_url(&url),
                display,
                comment_index,
            });
        }

        info!("Issue {} has {} attached files", issue, attachments.len());
        Ok(attachments)
    }

    fn file_content(&self, file_id: u64) -> Result<Vec<u8>> {
        let url = self.file_url(file_id)?;
        Ok(self.get(&url)?.body_mut().read_to_vec()?)
    }

    fn next_comment_index(&self, issue: u64) -> Result<u32> {
        Ok(self.issue_node(issue)?.next_comment_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = r#"{
        "nid": "123456",
        "comment_count": "3",
        "comments": [
            {"uri": "https://www.drupal.org/api-d7/comment/901", "id": "901", "resource": "comment"},
            {"uri": "https://www.drupal.org/api-d7/comment/902", "id": "902", "resource": "comment"},
            {"uri": "https://www.drupal.org/api-d7/comment/903", "id": 903, "resource": "comment"}
        ],
        "field_issue_files": [
            {"file": {"uri": "https://www.drupal.org/api-d7/file/13", "id": "13", "resource": "file", "cid": "903"}, "display": "1"},
            {"file": {"uri": "https://www.drupal.org/api-d7/file/11", "id": "11", "resource": "file", "cid": "901"}, "display": "0"},
            {"file": {"uri": "https://www.drupal.org/api-d7/file/12", "id": 12, "resource": "file", "cid": "902"}, "display": true}
        ]
    }"#;

    #[test]
    fn test_files_are_ordered_by_comment_position() {
        let node: IssueNode = serde_json::from_str(NODE).unwrap();
        assert_eq!(
            node.files(),
            vec![(11, false, 1), (12, true, 2), (13, true, 3)]
        );
    }

    #[test]
    fn test_next_comment_index_follows_comment_count() {
        let node: IssueNode = serde_json::from_str(NODE).unwrap();
        assert_eq!(node.next_comment_index(), 4);
    }

    #[test]
    fn test_file_without_known_comment_belongs_to_issue_body() {
        let node: IssueNode = serde_json::from_str(
            r#"{"field_issue_files": [{"file": {"id": "5", "cid": "0"}, "display": "1"}]}"#,
        )
        .unwrap();
        assert_eq!(node.files(), vec![(5, true, 0)]);
        assert_eq!(node.next_comment_index(), 1);
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = serde_json::from_str::<EntityRef>(r#"{"id": "abc"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://www.drupal.org/files/issues/2024-01-01/123456-7.patch"),
            "123456-7.patch"
        );
        assert_eq!(filename_from_url("plain.patch"), "plain.patch");
    }
}
