use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use git2::{Repository as Git2Repository, Status, StatusOptions};
use tracing::debug;

use super::commit::CommitInfo;
use super::GitExecutor;
use crate::error::{Error, Result};

pub struct Repository {
    repo: Git2Repository,
    path: PathBuf,
}

impl Repository {
    pub fn discover() -> Result<Self> {
        let repo = Git2Repository::discover(".")?;
        let path = repo.workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self { repo, path })
    }

    #[cfg(test)]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repository::open(path.as_ref())?;
        let path = repo.workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn branch_commit(&self, name: &str) -> Result<git2::Commit<'_>> {
        let branch = self.repo.find_branch(name, git2::BranchType::Local)?;
        Ok(branch.get().peel_to_commit()?)
    }

    fn resolve_commit(&self, rev: &str) -> Result<git2::Commit<'_>> {
        let obj = self.repo.revparse_single(rev)?;
        Ok(obj.peel_to_commit()?)
    }
}

impl GitExecutor for Repository {
    fn is_clean(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false);
        opts.include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.iter().all(|entry| entry.status() == Status::CURRENT))
    }

    fn local_branches(&self) -> Result<BTreeMap<String, String>> {
        let mut branches = BTreeMap::new();

        for branch_result in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch_result?;
            let name = match branch.name()? {
                Some(n) => n.to_string(),
                None => continue,
            };
            if let Some(oid) = branch.get().target() {
                branches.insert(name, oid.to_string());
            }
        }

        Ok(branches)
    }

    fn reachable_branches(&self) -> Result<BTreeMap<String, String>> {
        let head = self.repo.head()?.peel_to_commit()?.id();
        let mut reachable = BTreeMap::new();

        for (name, sha) in self.local_branches()? {
            let oid = git2::Oid::from_str(&sha)?;
            if oid == head || self.repo.graph_descendant_of(head, oid)? {
                reachable.insert(name, sha);
            }
        }

        Ok(reachable)
    }

    fn current_branch_name(&self) -> Result<Option<String>> {
        let head = self.repo.head()?;
        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            // Detached HEAD
            Ok(None)
        }
    }

    fn commit_log(&self, branch: &str, exclude: Option<&str>) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(self.branch_commit(branch)?.id())?;
        if let Some(stop) = exclude {
            revwalk.hide(self.resolve_commit(stop)?.id())?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(CommitInfo::from_commit(&commit));
        }

        Ok(commits)
    }

    fn diff(&self, from_ref: &str) -> Result<Vec<u8>> {
        let tree = self.resolve_commit(from_ref)?.tree()?;
        let diff = self.repo.diff_tree_to_workdir_with_index(Some(&tree), None)?;

        let mut patch = Vec::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            // File and hunk headers carry their own text; body lines need
            // their origin marker put back.
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin() as u8);
            }
            patch.extend_from_slice(line.content());
            true
        })?;

        Ok(patch)
    }

    fn apply_patch(&self, patch: &[u8]) -> Result<bool> {
        let diff = match git2::Diff::from_buffer(patch) {
            Ok(d) => d,
            Err(e) => {
                debug!("Patch could not be parsed: {}", e);
                return Ok(false);
            }
        };

        match self.repo.apply(&diff, git2::ApplyLocation::Both, None) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("Patch did not apply: {}", e);
                Ok(false)
            }
        }
    }

    fn commit(&self, message: &str, allow_empty: bool) -> Result<String> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;

        let signature = self.repo.signature()?;
        let parent_commit = self.repo.head()?.peel_to_commit()?;

        if !allow_empty && parent_commit.tree_id() == tree.id() {
            return Err(Error::NothingToCommit);
        }

        let commit_oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent_commit],
        )?;

        debug!("Committed {}", commit_oid);
        Ok(commit_oid.to_string())
    }

    fn create_branch(&self, name: &str, at: &str) -> Result<()> {
        let commit = self.resolve_commit(at)?;
        self.repo.branch(name, &commit, false)?;
        Ok(())
    }

    fn move_branch_pointer(&self, name: &str, to: &str) -> Result<()> {
        let commit = self.resolve_commit(to)?;

        if self.current_branch_name()?.as_deref() == Some(name) {
            // Moves the checked-out branch and brings index and tree along.
            self.repo.reset(commit.as_object(), git2::ResetType::Hard, None)?;
        } else {
            let refname = format!("refs/heads/{}", name);
            self.repo.reference(&refname, commit.id(), true, "patchtrail: move branch")?;
        }

        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", name);
        let obj = self.repo.revparse_single(&refname)?;

        self.repo.checkout_tree(&obj, None)?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    fn checkout_files(&self, rev: &str) -> Result<()> {
        let commit = self.resolve_commit(rev)?;
        let mut opts = git2::build::CheckoutBuilder::new();
        opts.force();
        self.repo.checkout_tree(commit.as_object(), Some(&mut opts))?;
        Ok(())
    }

    fn project_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MASTER: &str = "8.x-1.x";

    fn setup() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(MASTER);
        let raw = Git2Repository::init_opts(dir.path(), &opts).unwrap();
        {
            let mut config = raw.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        commit_file(&raw, "module.txt", "one\ntwo\nthree\n", "Initial commit.");
        (dir, raw)
    }

    fn commit_file(raw: &Git2Repository, name: &str, content: &str, message: &str) -> String {
        let root = raw.workdir().unwrap().to_path_buf();
        std::fs::write(root.join(name), content).unwrap();

        let mut index = raw.index().unwrap();
        index.read(false).unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = raw.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = raw.signature().unwrap();
        let parents = match raw.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        raw.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
            .to_string()
    }

    fn read(dir: &TempDir, name: &str) -> String {
        std::fs::read_to_string(dir.path().join(name)).unwrap()
    }

    #[test]
    fn test_clean_ignores_untracked_files() {
        let (dir, _raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        assert!(repo.is_clean().unwrap());

        std::fs::write(dir.path().join("123-4.module.patch"), "patch").unwrap();
        assert!(repo.is_clean().unwrap());

        std::fs::write(dir.path().join("module.txt"), "changed\n").unwrap();
        assert!(!repo.is_clean().unwrap());
    }

    #[test]
    fn test_diff_then_apply_round_trip() {
        let (dir, _raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();

        std::fs::write(dir.path().join("module.txt"), "one\ntwo\nthree\nfour\n").unwrap();
        let patch = repo.diff("HEAD").unwrap();
        let text = String::from_utf8(patch.clone()).unwrap();
        assert!(text.contains("diff --git a/module.txt b/module.txt"));
        assert!(text.contains("+four"));

        std::fs::write(dir.path().join("module.txt"), "one\ntwo\nthree\n").unwrap();
        assert!(repo.is_clean().unwrap());

        assert!(repo.apply_patch(&patch).unwrap());
        assert_eq!(read(&dir, "module.txt"), "one\ntwo\nthree\nfour\n");

        let sha = repo.commit("Applied.", false).unwrap();
        assert!(repo.is_clean().unwrap());
        let log = repo.commit_log(MASTER, None).unwrap();
        assert_eq!(log[0].id, sha);
        assert_eq!(log[0].message, "Applied.");
    }

    #[test]
    fn test_apply_failure_leaves_tree_untouched() {
        let (dir, _raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();

        let patch = concat!(
            "diff --git a/module.txt b/module.txt\n",
            "--- a/module.txt\n",
            "+++ b/module.txt\n",
            "@@ -1,3 +1,3 @@\n",
            " alpha\n",
            "-beta\n",
            "+gamma\n",
            " delta\n",
        )
        .as_bytes();

        assert!(!repo.apply_patch(patch).unwrap());
        assert!(!repo.apply_patch(b"not a patch at all").unwrap());
        assert!(repo.is_clean().unwrap());
        assert_eq!(read(&dir, "module.txt"), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_commit_refuses_empty_unless_allowed() {
        let (dir, _raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();

        assert!(matches!(repo.commit("Empty.", false), Err(Error::NothingToCommit)));
        let sha = repo.commit("Recorded.", true).unwrap();
        assert_eq!(repo.commit_log(MASTER, None).unwrap()[0].id, sha);
    }

    #[test]
    fn test_commit_log_stops_at_excluded_branch() {
        let (dir, raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let base = repo.local_branches().unwrap()[MASTER].clone();

        repo.create_branch("123-feature", &base).unwrap();
        repo.checkout_branch("123-feature").unwrap();
        commit_file(&raw, "module.txt", "one\n", "Feature one.");
        commit_file(&raw, "module.txt", "one\ntwo\n", "Feature two.");

        let log = repo.commit_log("123-feature", Some(MASTER)).unwrap();
        let messages: Vec<&str> = log.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["Feature two.", "Feature one."]);
    }

    #[test]
    fn test_reachable_branches_excludes_branches_ahead_of_head() {
        let (dir, raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let base = repo.local_branches().unwrap()[MASTER].clone();

        repo.create_branch("8.x-2.x", &base).unwrap();
        repo.checkout_branch("8.x-2.x").unwrap();
        commit_file(&raw, "module.txt", "ahead\n", "Ahead.");
        repo.checkout_branch(MASTER).unwrap();

        let reachable = repo.reachable_branches().unwrap();
        assert!(reachable.contains_key(MASTER));
        assert!(!reachable.contains_key("8.x-2.x"));
        assert_eq!(repo.current_branch_name().unwrap().as_deref(), Some(MASTER));
    }

    #[test]
    fn test_move_current_branch_resets_working_tree() {
        let (dir, raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let base = repo.local_branches().unwrap()[MASTER].clone();

        repo.create_branch("123-feature", &base).unwrap();
        repo.checkout_branch("123-feature").unwrap();
        let tip = commit_file(&raw, "module.txt", "local work\n", "Local work.");

        repo.create_branch("123-feature-forked", &tip).unwrap();
        repo.move_branch_pointer("123-feature", &base).unwrap();

        let branches = repo.local_branches().unwrap();
        assert_eq!(branches["123-feature"], base);
        assert_eq!(branches["123-feature-forked"], tip);
        assert_eq!(read(&dir, "module.txt"), "one\ntwo\nthree\n");
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_move_other_branch_only_moves_ref() {
        let (dir, raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let base = repo.local_branches().unwrap()[MASTER].clone();
        let next = commit_file(&raw, "module.txt", "next\n", "Next.");

        repo.create_branch("other", &next).unwrap();
        repo.move_branch_pointer("other", &base).unwrap();

        assert_eq!(repo.local_branches().unwrap()["other"], base);
        assert_eq!(read(&dir, "module.txt"), "next\n");
    }

    #[test]
    fn test_checkout_files_keeps_head() {
        let (dir, raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let base = repo.local_branches().unwrap()[MASTER].clone();

        repo.create_branch("123-feature", &base).unwrap();
        repo.checkout_branch("123-feature").unwrap();
        commit_file(&raw, "module.txt", "patched\n", "Patch one.");
        commit_file(&raw, "extra.txt", "extra\n", "Patch one, part two.");

        repo.checkout_files(MASTER).unwrap();
        assert_eq!(read(&dir, "module.txt"), "one\ntwo\nthree\n");
        assert!(!dir.path().join("extra.txt").exists());
        assert_eq!(repo.current_branch_name().unwrap().as_deref(), Some("123-feature"));
        assert!(!repo.is_clean().unwrap());

        repo.checkout_files("HEAD").unwrap();
        assert_eq!(read(&dir, "module.txt"), "patched\n");
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_project_name_is_directory_name() {
        let (dir, _raw) = setup();
        let repo = Repository::open(dir.path()).unwrap();
        let expected = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(repo.project_name(), expected);
    }
}
