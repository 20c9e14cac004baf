use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::git::short_sha;

/// The upstream development branch, e.g. `7.x-1.x`, `7.x` or `8.0.x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterBranch {
    pub name: String,
    pub sha: String,
    pub is_current: bool,
}

/// The local branch tracking one issue, named `<issue>-<description>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureBranch {
    pub name: String,
    pub sha: String,
    pub is_current: bool,
    pub issue_number: u64,
    pub description: String,
}

fn master_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+\.x-\d+\.x|\d+\.x|\d+\.\d+\.x)$").unwrap())
}

fn feature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)-(.+)$").unwrap())
}

impl MasterBranch {
    /// Picks the highest-versioned reachable branch that looks like a
    /// development branch.
    pub fn locate(reachable: &BTreeMap<String, String>, current: Option<&str>) -> Result<Self> {
        let mut names: Vec<&String> = reachable.keys().collect();
        names.sort_by(|a, b| version_compare(b, a).then_with(|| a.cmp(b)));

        let name = names
            .into_iter()
            .find(|name| master_pattern().is_match(name.trim()))
            .ok_or(Error::NoMasterBranchFound)?;

        debug!("Master branch is {}", name);
        Ok(Self {
            name: name.trim().to_string(),
            sha: reachable[name].clone(),
            is_current: current == Some(name.as_str()),
        })
    }
}

impl FeatureBranch {
    /// Splits `<issue>-<description>` branch names.
    pub fn parse_name(name: &str) -> Option<(u64, String)> {
        let caps = feature_pattern().captures(name)?;
        let issue = caps[1].parse().ok()?;
        Some((issue, caps[2].to_string()))
    }

    /// Finds the feature branch among all local branches, restricted to
    /// `issue` when given. The current branch wins over other candidates.
    pub fn locate(
        branches: &BTreeMap<String, String>,
        current: Option<&str>,
        issue: Option<u64>,
    ) -> Result<Self> {
        let candidates: Vec<(&String, u64, String)> = branches
            .keys()
            .filter_map(|name| {
                let (number, description) = Self::parse_name(name)?;
                Some((name, number, description))
            })
            .filter(|(_, number, _)| issue.map_or(true, |wanted| wanted == *number))
            .collect();

        let chosen = candidates
            .iter()
            .find(|(name, _, _)| current == Some(name.as_str()))
            .or_else(|| candidates.first())
            .ok_or(Error::FeatureBranchMissing)?;

        let (name, issue_number, description) = chosen;
        Ok(Self {
            name: name.to_string(),
            sha: branches[*name].clone(),
            is_current: current == Some(name.as_str()),
            issue_number: *issue_number,
            description: description.clone(),
        })
    }

    pub fn require_current(&self) -> Result<()> {
        if self.is_current {
            Ok(())
        } else {
            Err(Error::FeatureBranchNotCurrent(self.name.clone()))
        }
    }

    /// Branch that keeps local work found beyond the last known patch.
    pub fn fork_branch_name(&self) -> String {
        format!("{}-forked-{}", self.name, short_sha(&self.sha))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Word(String),
}

/// Splits a version into number and word runs; `.`, `-`, `_` and `+`
/// only separate.
fn segments(version: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, out: &mut Vec<Segment>| {
        if current.is_empty() {
            return;
        }
        let seg = match current.parse::<u64>() {
            Ok(n) => Segment::Number(n),
            Err(_) => Segment::Word(current.to_lowercase()),
        };
        out.push(seg);
        current.clear();
    };

    for c in version.chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            flush(&mut current, &mut out);
            continue;
        }
        let switches = current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != c.is_ascii_digit());
        if switches {
            flush(&mut current, &mut out);
        }
        current.push(c);
    }
    flush(&mut current, &mut out);
    out
}

const NUMBER_RANK: i32 = 4;

/// Pre-release words rank below numbers, patch levels above; anything else
/// (such as the `x` in `7.x`) ranks lowest.
fn word_rank(word: &str) -> i32 {
    match word {
        "dev" => 0,
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "rc" => 3,
        "pl" | "p" => 5,
        _ => -1,
    }
}

fn rank(segment: &Segment) -> i32 {
    match segment {
        Segment::Number(_) => NUMBER_RANK,
        Segment::Word(w) => word_rank(w),
    }
}

/// Version ordering in the style of PHP's `version_compare`.
pub fn version_compare(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Segment::Number(x), Segment::Number(y)) => x.cmp(y),
            _ => rank(l).cmp(&rank(r)),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // A longer version is newer if it continues with a number, and compared
    // against a release otherwise ("1.0rc1" < "1.0" < "1.0pl1").
    match left.len().cmp(&right.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater => rank(&left[right.len()]).cmp(&NUMBER_RANK).then(Ordering::Greater),
        Ordering::Less => NUMBER_RANK.cmp(&rank(&right[left.len()])).then(Ordering::Less),
    }
}
