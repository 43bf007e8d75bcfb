//! forge::mock
//!
//! In-memory forge for deterministic testing.
//!
//! # Design
//!
//! A [`MockForge`] is a handle onto one repository inside a shared
//! in-memory network. The network holds a content-addressed object database
//! (blobs, flat trees and commits, identified by sha256) that all forks of
//! a repository share, plus per-repository refs, pull requests and commit
//! statuses.
//!
//! Behavior mirrors the hosting API closely enough for workflow tests:
//!
//! - non-force ref updates must be fast-forwards
//! - `compare` walks first parents to the merge base and detects renames
//! - merging requires the base tip to be an ancestor of the head, and
//!   otherwise fails with `MergeConflict` like a 405
//! - every call yields to the scheduler first, so concurrent futures
//!   interleave the way they would against a network
//!
//! Failures can be injected per operation with [`FailOn`] and every call is
//! recorded as a [`MockOperation`].
//!
//! # Example
//!
//! ```
//! use draftwork::forge::mock::MockForge;
//! use draftwork::forge::{Forge, CreatePrRequest, PrState};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new("octo/blog");
//! forge.seed_branch("main", &[("README.md", "hello")]);
//! forge.seed_branch("cms/posts/a", &[("posts/a.md", "draft")]);
//!
//! let pr = forge.create_pr(CreatePrRequest {
//!     head: "cms/posts/a".to_string(),
//!     base: "main".to_string(),
//!     title: "Create Post “a”".to_string(),
//!     body: None,
//! }).await.unwrap();
//!
//! assert_eq!(pr.number, 1);
//! assert_eq!(pr.state, PrState::Open);
//! # });
//! ```

use async_trait::async_trait;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::traits::{
    ChangedFile, Commit, CommitStatus, Comparison, CreateCommitRequest, CreatePrRequest,
    EntryKind, FileContent, FileStatus, Forge, ForgeError, ForgeUser, ListPullsOpts, MergeMethod,
    MergeRequest, PrState, PullRequest, RefInfo, Signature, TreeChange, UpdatePrRequest,
};
use crate::core::types::Oid;

type Tree = BTreeMap<String, Oid>;

/// Mock forge for testing.
///
/// Clones share both the network and the per-handle failure/recording state.
#[derive(Debug, Clone)]
pub struct MockForge {
    network: Arc<Mutex<MockNetwork>>,
    control: Arc<Mutex<MockControl>>,
    full_name: String,
}

#[derive(Debug, Default)]
struct MockNetwork {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, Tree>,
    commits: HashMap<Oid, Commit>,
    repos: HashMap<String, RepoState>,
    counter: u64,
}

#[derive(Debug)]
struct RepoState {
    refs: BTreeMap<String, Oid>,
    prs: BTreeMap<u64, MockPr>,
    next_pr: u64,
    statuses: HashMap<Oid, Vec<CommitStatus>>,
}

impl RepoState {
    fn empty() -> Self {
        Self {
            refs: BTreeMap::new(),
            prs: BTreeMap::new(),
            next_pr: 1,
            statuses: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct MockPr {
    number: u64,
    state: PrState,
    head_repo: String,
    head_branch: String,
    /// Last known head; frozen once the PR is no longer open
    head_sha: Oid,
    base: String,
    title: String,
    body: Option<String>,
}

#[derive(Debug)]
struct MockControl {
    user: ForgeUser,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

/// Operation kinds, used for failure injection and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CurrentUser,
    GetRef,
    CreateRef,
    UpdateRef,
    DeleteRef,
    ListRefs,
    GetBlob,
    GetFile,
    CreateBlob,
    CreateTree,
    GetCommit,
    CreateCommit,
    Compare,
    CreatePr,
    UpdatePr,
    GetPr,
    FindPrByHead,
    ListPrs,
    MergePr,
    GetStatuses,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub struct FailOn {
    pub op: Op,
    pub error: ForgeError,
    /// Only fail calls whose target (ref name, file path) contains this
    pub target: Option<String>,
    /// Number of failures left; `None` fails forever
    pub remaining: Option<usize>,
}

impl FailOn {
    /// Fail every matching call.
    pub fn always(op: Op, error: ForgeError) -> Self {
        Self {
            op,
            error,
            target: None,
            remaining: None,
        }
    }

    /// Fail the next matching call only.
    pub fn once(op: Op, error: ForgeError) -> Self {
        Self {
            remaining: Some(1),
            ..Self::always(op, error)
        }
    }

    /// Restrict to calls whose target contains `target`.
    pub fn on_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CurrentUser,
    GetRef { name: String },
    CreateRef { name: String, sha: Oid },
    UpdateRef { name: String, sha: Oid, force: bool },
    DeleteRef { name: String },
    ListRefs { prefix: String },
    GetBlob { sha: Oid },
    GetFile { path: String, git_ref: String },
    CreateBlob,
    CreateTree { base: Option<Oid>, changes: Vec<TreeChange> },
    GetCommit { sha: Oid },
    CreateCommit { message: String, parents: Vec<Oid> },
    Compare { base: String, head: String },
    CreatePr { head: String, base: String, title: String },
    UpdatePr { number: u64, state: Option<PrState> },
    GetPr { number: u64 },
    FindPrByHead { head: String },
    ListPrs,
    MergePr { number: u64, method: MergeMethod },
    GetStatuses { sha: Oid },
}

impl MockOperation {
    pub fn op(&self) -> Op {
        match self {
            MockOperation::CurrentUser => Op::CurrentUser,
            MockOperation::GetRef { .. } => Op::GetRef,
            MockOperation::CreateRef { .. } => Op::CreateRef,
            MockOperation::UpdateRef { .. } => Op::UpdateRef,
            MockOperation::DeleteRef { .. } => Op::DeleteRef,
            MockOperation::ListRefs { .. } => Op::ListRefs,
            MockOperation::GetBlob { .. } => Op::GetBlob,
            MockOperation::GetFile { .. } => Op::GetFile,
            MockOperation::CreateBlob => Op::CreateBlob,
            MockOperation::CreateTree { .. } => Op::CreateTree,
            MockOperation::GetCommit { .. } => Op::GetCommit,
            MockOperation::CreateCommit { .. } => Op::CreateCommit,
            MockOperation::Compare { .. } => Op::Compare,
            MockOperation::CreatePr { .. } => Op::CreatePr,
            MockOperation::UpdatePr { .. } => Op::UpdatePr,
            MockOperation::GetPr { .. } => Op::GetPr,
            MockOperation::FindPrByHead { .. } => Op::FindPrByHead,
            MockOperation::ListPrs => Op::ListPrs,
            MockOperation::MergePr { .. } => Op::MergePr,
            MockOperation::GetStatuses { .. } => Op::GetStatuses,
        }
    }

    /// The ref name or path this operation acts on, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            MockOperation::GetRef { name }
            | MockOperation::CreateRef { name, .. }
            | MockOperation::UpdateRef { name, .. }
            | MockOperation::DeleteRef { name } => Some(name),
            MockOperation::ListRefs { prefix } => Some(prefix),
            MockOperation::GetFile { path, .. } => Some(path),
            MockOperation::CreatePr { head, .. } | MockOperation::FindPrByHead { head } => {
                Some(head)
            }
            _ => None,
        }
    }
}

fn object_id(kind: &str, parts: &[&[u8]]) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    // A sha256 digest is always 64 hex characters.
    Oid::new(hex::encode(hasher.finalize())).expect("sha256 digest is a valid oid")
}

fn not_found(what: impl std::fmt::Display) -> ForgeError {
    ForgeError::NotFound(what.to_string())
}

fn normalize_ref(name: &str) -> &str {
    name.strip_prefix("refs/").unwrap_or(name)
}

fn mock_signature() -> Signature {
    Signature {
        name: "Mock Author".into(),
        email: "mock@example.com".into(),
        date: chrono::Utc::now(),
    }
}

impl MockNetwork {
    fn repo(&self, full_name: &str) -> Result<&RepoState, ForgeError> {
        self.repos
            .get(full_name)
            .ok_or_else(|| not_found(format!("repository {full_name}")))
    }

    fn repo_mut(&mut self, full_name: &str) -> Result<&mut RepoState, ForgeError> {
        self.repos
            .get_mut(full_name)
            .ok_or_else(|| not_found(format!("repository {full_name}")))
    }

    fn put_blob(&mut self, bytes: Vec<u8>) -> Oid {
        let sha = object_id("blob", &[&bytes]);
        self.blobs.entry(sha.clone()).or_insert(bytes);
        sha
    }

    fn put_tree(&mut self, tree: Tree) -> Oid {
        let mut encoded = Vec::new();
        for (path, sha) in &tree {
            encoded.extend_from_slice(path.as_bytes());
            encoded.push(b' ');
            encoded.extend_from_slice(sha.as_str().as_bytes());
            encoded.push(b'\n');
        }
        let sha = object_id("tree", &[&encoded]);
        self.trees.entry(sha.clone()).or_insert(tree);
        sha
    }

    fn put_commit(
        &mut self,
        tree: Oid,
        parents: Vec<Oid>,
        message: String,
        author: Option<Signature>,
        committer: Option<Signature>,
    ) -> Commit {
        self.counter += 1;
        let parent_list: Vec<&str> = parents.iter().map(|p| p.as_str()).collect();
        let counter = self.counter.to_string();
        let sha = object_id(
            "commit",
            &[
                tree.as_str().as_bytes(),
                parent_list.join(",").as_bytes(),
                message.as_bytes(),
                counter.as_bytes(),
            ],
        );
        let commit = Commit {
            sha: sha.clone(),
            tree,
            parents,
            message,
            author,
            committer,
        };
        self.commits.insert(sha, commit.clone());
        commit
    }

    fn commit(&self, sha: &Oid) -> Result<&Commit, ForgeError> {
        self.commits
            .get(sha)
            .ok_or_else(|| not_found(format!("commit {sha}")))
    }

    fn tree(&self, sha: &Oid) -> Result<&Tree, ForgeError> {
        self.trees
            .get(sha)
            .ok_or_else(|| not_found(format!("tree {sha}")))
    }

    fn tree_of(&self, commit: &Oid) -> Result<&Tree, ForgeError> {
        let tree = self.commit(commit)?.tree.clone();
        self.tree(&tree)
    }

    /// Resolve a sha, a ref name (`heads/main`, `refs/meta/x`) or a bare branch.
    fn resolve(&self, repo: &str, spec: &str) -> Result<Oid, ForgeError> {
        if let Ok(oid) = Oid::new(spec) {
            if self.commits.contains_key(&oid) {
                return Ok(oid);
            }
        }
        let state = self.repo(repo)?;
        let name = normalize_ref(spec);
        state
            .refs
            .get(name)
            .or_else(|| state.refs.get(&format!("heads/{name}")))
            .cloned()
            .ok_or_else(|| not_found(format!("ref {spec}")))
    }

    fn ancestors(&self, tip: &Oid) -> HashSet<Oid> {
        let mut seen = HashSet::new();
        let mut stack = vec![tip.clone()];
        while let Some(sha) = stack.pop() {
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&sha) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        self.ancestors(descendant).contains(ancestor)
    }

    /// Walk first parents of `head` until reaching an ancestor of `base`.
    ///
    /// Returns the merge base and the unique commits, oldest first.
    fn merge_base(&self, base: &Oid, head: &Oid) -> Result<(Oid, Vec<Commit>), ForgeError> {
        let reachable = self.ancestors(base);
        let mut unique = Vec::new();
        let mut cursor = head.clone();
        loop {
            if reachable.contains(&cursor) {
                unique.reverse();
                return Ok((cursor, unique));
            }
            let commit = self.commit(&cursor)?.clone();
            let Some(parent) = commit.parents.first().cloned() else {
                return Err(not_found(format!("no common ancestor of {base} and {head}")));
            };
            unique.push(commit);
            cursor = parent;
        }
    }

    fn apply_changes(&self, base: Option<&Oid>, changes: &[TreeChange]) -> Result<Tree, ForgeError> {
        let mut tree = match base {
            Some(sha) => self.tree(sha)?.clone(),
            None => Tree::new(),
        };
        for change in changes {
            let path = change.path.trim_matches('/').to_string();
            match (&change.kind, &change.sha) {
                (EntryKind::Blob, Some(sha)) => {
                    if !self.blobs.contains_key(sha) {
                        return Err(ForgeError::ApiError {
                            status: 422,
                            message: format!("blob {sha} does not exist"),
                        });
                    }
                    tree.insert(path, sha.clone());
                }
                (EntryKind::Blob, None) => {
                    tree.remove(&path);
                }
                (EntryKind::Tree, sha) => {
                    let prefix = format!("{path}/");
                    tree.retain(|p, _| !p.starts_with(&prefix));
                    if let Some(sha) = sha {
                        for (sub, blob) in self.tree(sha)? {
                            tree.insert(format!("{prefix}{sub}"), blob.clone());
                        }
                    }
                }
            }
        }
        Ok(tree)
    }

    fn diff(old: &Tree, new: &Tree) -> Vec<ChangedFile> {
        let mut removed: Vec<(String, Oid)> = Vec::new();
        let mut added: Vec<(String, Oid)> = Vec::new();
        let mut files = Vec::new();

        for (path, sha) in old {
            match new.get(path) {
                None => removed.push((path.clone(), sha.clone())),
                Some(new_sha) if new_sha != sha => files.push(ChangedFile {
                    filename: path.clone(),
                    status: FileStatus::Modified,
                    sha: Some(new_sha.clone()),
                    previous_filename: None,
                }),
                Some(_) => {}
            }
        }
        for (path, sha) in new {
            if !old.contains_key(path) {
                added.push((path.clone(), sha.clone()));
            }
        }

        for (path, sha) in added {
            match removed.iter().position(|(_, old_sha)| *old_sha == sha) {
                Some(idx) => {
                    let (previous, _) = removed.remove(idx);
                    files.push(ChangedFile {
                        filename: path,
                        status: FileStatus::Renamed,
                        sha: Some(sha),
                        previous_filename: Some(previous),
                    });
                }
                None => files.push(ChangedFile {
                    filename: path,
                    status: FileStatus::Added,
                    sha: Some(sha),
                    previous_filename: None,
                }),
            }
        }
        for (path, _) in removed {
            files.push(ChangedFile {
                filename: path,
                status: FileStatus::Removed,
                sha: None,
                previous_filename: None,
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        files
    }

    fn view_pr(&self, repo: &str, pr: &MockPr) -> PullRequest {
        let head_sha = if pr.state == PrState::Open {
            self.repos
                .get(&pr.head_repo)
                .and_then(|r| r.refs.get(&format!("heads/{}", pr.head_branch)))
                .cloned()
                .unwrap_or_else(|| pr.head_sha.clone())
        } else {
            pr.head_sha.clone()
        };
        PullRequest {
            number: pr.number,
            url: format!("https://github.com/{repo}/pull/{}", pr.number),
            state: pr.state,
            head: pr.head_branch.clone(),
            head_sha,
            head_repo: Some(pr.head_repo.clone()),
            base: pr.base.clone(),
            title: pr.title.clone(),
            body: pr.body.clone(),
        }
    }

    /// Split `owner:branch` into the head repository and branch.
    fn head_location(&self, repo: &str, head: &str) -> (String, String) {
        match head.split_once(':') {
            Some((owner, branch)) => {
                let name = repo.split_once('/').map(|(_, n)| n).unwrap_or(repo);
                let exact = format!("{owner}/{name}");
                let head_repo = if self.repos.contains_key(&exact) {
                    exact
                } else {
                    self.repos
                        .keys()
                        .find(|k| k.starts_with(&format!("{owner}/")))
                        .cloned()
                        .unwrap_or(exact)
                };
                (head_repo, branch.to_string())
            }
            None => (repo.to_string(), head.to_string()),
        }
    }

    fn merge(
        &mut self,
        repo: &str,
        number: u64,
        method: MergeMethod,
        expected: Option<&Oid>,
        require_ancestor: bool,
    ) -> Result<(), ForgeError> {
        let pr = self
            .repo(repo)?
            .prs
            .get(&number)
            .cloned()
            .ok_or_else(|| not_found(format!("PR #{number}")))?;
        if pr.state != PrState::Open {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("PR #{number} is not open"),
            });
        }
        let view = self.view_pr(repo, &pr);
        if let Some(expected) = expected {
            if *expected != view.head_sha {
                return Err(ForgeError::ApiError {
                    status: 409,
                    message: "Head branch was modified. Review and try the merge again.".into(),
                });
            }
        }

        let base_ref = format!("heads/{}", pr.base);
        let base_tip = self
            .repo(repo)?
            .refs
            .get(&base_ref)
            .cloned()
            .ok_or_else(|| not_found(format!("ref {base_ref}")))?;
        let head = view.head_sha.clone();

        let tree = if self.is_ancestor(&base_tip, &head) {
            self.commit(&head)?.tree.clone()
        } else if require_ancestor {
            return Err(ForgeError::MergeConflict(format!(
                "PR #{number} is not mergeable"
            )));
        } else {
            let (merge_base, _) = self.merge_base(&base_tip, &head)?;
            let changes: Vec<TreeChange> =
                Self::diff(self.tree_of(&merge_base)?, self.tree_of(&head)?)
                    .into_iter()
                    .flat_map(|file| {
                        let mut out = Vec::new();
                        if let Some(prev) = file.previous_filename {
                            out.push(blob_entry(prev, None));
                        }
                        out.push(blob_entry(file.filename, file.sha));
                        out
                    })
                    .collect();
            let base_tree = self.commit(&base_tip)?.tree.clone();
            let merged = self.apply_changes(Some(&base_tree), &changes)?;
            self.put_tree(merged)
        };

        let (parents, message) = match method {
            MergeMethod::Merge => (
                vec![base_tip, head],
                format!(
                    "Merge pull request #{number} from {}/{}",
                    pr.head_repo, pr.head_branch
                ),
            ),
            MergeMethod::Squash | MergeMethod::Rebase => {
                (vec![base_tip], format!("{} (#{number})", pr.title))
            }
        };
        let commit = self.put_commit(
            tree,
            parents,
            message,
            Some(mock_signature()),
            Some(mock_signature()),
        );

        let state = self.repo_mut(repo)?;
        state.refs.insert(base_ref, commit.sha);
        if let Some(stored) = state.prs.get_mut(&number) {
            stored.state = PrState::Merged;
            stored.head_sha = view.head_sha;
        }
        Ok(())
    }
}

fn blob_entry(path: String, sha: Option<Oid>) -> TreeChange {
    TreeChange {
        path,
        mode: "100644".into(),
        kind: EntryKind::Blob,
        sha,
    }
}

impl MockForge {
    /// Create a mock forge for an empty repository `owner/repo`.
    pub fn new(full_name: &str) -> Self {
        let mut network = MockNetwork::default();
        network
            .repos
            .insert(full_name.to_string(), RepoState::empty());
        let owner = full_name.split('/').next().unwrap_or(full_name);
        Self {
            network: Arc::new(Mutex::new(network)),
            control: Arc::new(Mutex::new(MockControl {
                user: ForgeUser {
                    login: owner.to_string(),
                    name: None,
                },
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
            full_name: full_name.to_string(),
        }
    }

    /// Set the user returned by `current_user`.
    pub fn with_user(self, login: &str, name: Option<&str>) -> Self {
        self.control.lock().unwrap().user = ForgeUser {
            login: login.to_string(),
            name: name.map(str::to_string),
        };
        self
    }

    /// Fork this repository into `owner`'s namespace.
    ///
    /// The fork shares the object database and starts with a copy of every
    /// ref. It has its own failure and recording state.
    pub fn fork(&self, owner: &str) -> MockForge {
        let name = self
            .full_name
            .split_once('/')
            .map(|(_, n)| n)
            .unwrap_or(&self.full_name);
        let fork_name = format!("{owner}/{name}");
        {
            let mut net = self.network.lock().unwrap();
            let refs = net
                .repos
                .get(&self.full_name)
                .map(|r| r.refs.clone())
                .unwrap_or_default();
            let mut state = RepoState::empty();
            state.refs = refs;
            net.repos.insert(fork_name.clone(), state);
        }
        MockForge {
            network: Arc::clone(&self.network),
            control: Arc::new(Mutex::new(MockControl {
                user: ForgeUser {
                    login: owner.to_string(),
                    name: None,
                },
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
            full_name: fork_name,
        }
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use draftwork::forge::mock::{FailOn, MockForge, Op};
    /// use draftwork::forge::ForgeError;
    ///
    /// let forge = MockForge::new("octo/blog")
    ///     .fail_on(FailOn::always(Op::CreatePr, ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inject(fail_on);
        self
    }

    /// Add a failure rule to an existing handle.
    pub fn inject(&self, fail_on: FailOn) {
        self.control.lock().unwrap().fail_on.push(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.control.lock().unwrap().fail_on.clear();
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.control.lock().unwrap().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.control.lock().unwrap().operations.clear();
    }

    /// Number of recorded calls of one kind.
    pub fn count(&self, op: Op) -> usize {
        self.control
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|o| o.op() == op)
            .count()
    }

    // Seeding and inspection helpers. These bypass recording and failures.

    /// Create (or reset) `branch` to a parentless commit holding `files`.
    pub fn seed_branch(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let mut net = self.network.lock().unwrap();
        let mut tree = Tree::new();
        for (path, content) in files {
            let sha = net.put_blob(content.as_bytes().to_vec());
            tree.insert(path.to_string(), sha);
        }
        let tree = net.put_tree(tree);
        let commit = net.put_commit(
            tree,
            Vec::new(),
            "Initial commit".into(),
            Some(mock_signature()),
            Some(mock_signature()),
        );
        if let Some(repo) = net.repos.get_mut(&self.full_name) {
            repo.refs.insert(format!("heads/{branch}"), commit.sha.clone());
        }
        commit.sha
    }

    /// Commit file changes onto an existing branch as an outside actor.
    ///
    /// `None` content deletes the path.
    pub fn commit_files(&self, branch: &str, files: &[(&str, Option<&str>)], message: &str) -> Oid {
        self.commit_changes(branch, files, message, mock_signature())
    }

    /// Like [`commit_files`](Self::commit_files) with an explicit author.
    pub fn commit_changes(
        &self,
        branch: &str,
        files: &[(&str, Option<&str>)],
        message: &str,
        author: Signature,
    ) -> Oid {
        let mut net = self.network.lock().unwrap();
        let ref_name = format!("heads/{branch}");
        let parent = net.repos[&self.full_name].refs[&ref_name].clone();
        let mut changes = Vec::new();
        for (path, content) in files {
            let sha = content.map(|c| net.put_blob(c.as_bytes().to_vec()));
            changes.push(blob_entry(path.to_string(), sha));
        }
        let base_tree = net.commits[&parent].tree.clone();
        let tree = net
            .apply_changes(Some(&base_tree), &changes)
            .expect("seeded blobs exist");
        let tree = net.put_tree(tree);
        let commit = net.put_commit(
            tree,
            vec![parent],
            message.to_string(),
            Some(author.clone()),
            Some(author),
        );
        if let Some(repo) = net.repos.get_mut(&self.full_name) {
            repo.refs.insert(ref_name, commit.sha.clone());
        }
        commit.sha
    }

    /// Current sha of a ref (`heads/main`, `meta/_draftwork`).
    pub fn ref_sha(&self, name: &str) -> Option<Oid> {
        let net = self.network.lock().unwrap();
        net.repos
            .get(&self.full_name)
            .and_then(|r| r.refs.get(normalize_ref(name)).cloned())
    }

    /// All ref names in this repository.
    pub fn ref_names(&self) -> Vec<String> {
        let net = self.network.lock().unwrap();
        net.repos
            .get(&self.full_name)
            .map(|r| r.refs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of `path` at `git_ref`, if present and valid UTF-8.
    pub fn file_at(&self, git_ref: &str, path: &str) -> Option<String> {
        let net = self.network.lock().unwrap();
        let tip = net.resolve(&self.full_name, git_ref).ok()?;
        let blob = net.tree_of(&tip).ok()?.get(path)?.clone();
        String::from_utf8(net.blobs.get(&blob)?.clone()).ok()
    }

    /// All file paths at `git_ref`.
    pub fn paths_at(&self, git_ref: &str) -> Vec<String> {
        let net = self.network.lock().unwrap();
        net.resolve(&self.full_name, git_ref)
            .and_then(|tip| net.tree_of(&tip).map(|t| t.keys().cloned().collect()))
            .unwrap_or_default()
    }

    /// Blob sha of `path` at `git_ref`.
    pub fn blob_sha_at(&self, git_ref: &str, path: &str) -> Option<Oid> {
        let net = self.network.lock().unwrap();
        let tip = net.resolve(&self.full_name, git_ref).ok()?;
        net.tree_of(&tip).ok()?.get(path).cloned()
    }

    /// Look up a commit without recording.
    pub fn commit_info(&self, sha: &Oid) -> Option<Commit> {
        self.network.lock().unwrap().commits.get(sha).cloned()
    }

    /// Get a PR by number (for test verification).
    pub fn pr(&self, number: u64) -> Option<PullRequest> {
        let net = self.network.lock().unwrap();
        let pr = net.repos.get(&self.full_name)?.prs.get(&number)?;
        Some(net.view_pr(&self.full_name, pr))
    }

    /// Get all PRs (for test verification).
    pub fn all_prs(&self) -> Vec<PullRequest> {
        let net = self.network.lock().unwrap();
        match net.repos.get(&self.full_name) {
            Some(repo) => repo
                .prs
                .values()
                .map(|pr| net.view_pr(&self.full_name, pr))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Merge a PR as a maintainer would through the web UI.
    ///
    /// Unlike `merge_pr`, this succeeds when the base has moved on.
    pub fn merge_pr_externally(&self, number: u64) -> Result<(), ForgeError> {
        let mut net = self.network.lock().unwrap();
        net.merge(&self.full_name, number, MergeMethod::Merge, None, false)
    }

    /// Close a PR as a maintainer would.
    pub fn close_pr_externally(&self, number: u64) -> Result<(), ForgeError> {
        let mut net = self.network.lock().unwrap();
        let pr = net
            .repo(&self.full_name)?
            .prs
            .get(&number)
            .cloned()
            .ok_or_else(|| not_found(format!("PR #{number}")))?;
        let head_sha = net.view_pr(&self.full_name, &pr).head_sha;
        let stored = net
            .repo_mut(&self.full_name)?
            .prs
            .get_mut(&number)
            .ok_or_else(|| not_found(format!("PR #{number}")))?;
        stored.state = PrState::Closed;
        stored.head_sha = head_sha;
        Ok(())
    }

    /// Attach a commit status, as a CI system would.
    pub fn set_status(&self, sha: &Oid, status: CommitStatus) {
        let mut net = self.network.lock().unwrap();
        if let Some(repo) = net.repos.get_mut(&self.full_name) {
            repo.statuses.entry(sha.clone()).or_default().push(status);
        }
    }

    /// Yield, record the call, then apply any matching failure rule.
    async fn enter(&self, op: MockOperation) -> Result<(), ForgeError> {
        tokio::task::yield_now().await;
        let mut control = self.control.lock().unwrap();
        let kind = op.op();
        let target = op.target().map(str::to_string);
        control.operations.push(op);

        let hit = control.fail_on.iter().position(|rule| {
            rule.op == kind
                && match (&rule.target, &target) {
                    (None, _) => true,
                    (Some(want), Some(got)) => got.contains(want.as_str()),
                    (Some(_), None) => false,
                }
        });
        let Some(idx) = hit else {
            return Ok(());
        };
        let rule = &mut control.fail_on[idx];
        let error = rule.error.clone();
        let exhausted = match rule.remaining.as_mut() {
            Some(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            None => false,
        };
        if exhausted {
            control.fail_on.remove(idx);
        }
        Err(error)
    }

    fn net(&self) -> std::sync::MutexGuard<'_, MockNetwork> {
        self.network.lock().unwrap()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    async fn current_user(&self) -> Result<ForgeUser, ForgeError> {
        self.enter(MockOperation::CurrentUser).await?;
        Ok(self.control.lock().unwrap().user.clone())
    }

    async fn get_ref(&self, name: &str) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::GetRef { name: name.into() }).await?;
        let net = self.net();
        net.repo(&self.full_name)?
            .refs
            .get(normalize_ref(name))
            .cloned()
            .ok_or_else(|| not_found(format!("ref {name}")))
    }

    async fn create_ref(&self, name: &str, sha: &Oid) -> Result<(), ForgeError> {
        self.enter(MockOperation::CreateRef {
            name: name.into(),
            sha: sha.clone(),
        })
        .await?;
        let mut net = self.net();
        net.commit(sha)?;
        let repo = net.repo_mut(&self.full_name)?;
        let key = normalize_ref(name).to_string();
        if repo.refs.contains_key(&key) {
            return Err(ForgeError::Conflict(format!("Reference already exists: {name}")));
        }
        repo.refs.insert(key, sha.clone());
        Ok(())
    }

    async fn update_ref(&self, name: &str, sha: &Oid, force: bool) -> Result<(), ForgeError> {
        self.enter(MockOperation::UpdateRef {
            name: name.into(),
            sha: sha.clone(),
            force,
        })
        .await?;
        let mut net = self.net();
        net.commit(sha)?;
        let key = normalize_ref(name).to_string();
        let current = net
            .repo(&self.full_name)?
            .refs
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(format!("Reference does not exist: {name}")))?;
        if !force && !net.is_ancestor(&current, sha) {
            return Err(ForgeError::Conflict(format!(
                "Update is not a fast forward: {name}"
            )));
        }
        net.repo_mut(&self.full_name)?.refs.insert(key, sha.clone());
        Ok(())
    }

    async fn delete_ref(&self, name: &str) -> Result<(), ForgeError> {
        self.enter(MockOperation::DeleteRef { name: name.into() })
            .await?;
        let mut net = self.net();
        net.repo_mut(&self.full_name)?
            .refs
            .remove(normalize_ref(name))
            .map(|_| ())
            .ok_or_else(|| not_found(format!("Reference does not exist: {name}")))
    }

    async fn list_refs(&self, prefix: &str) -> Result<Vec<RefInfo>, ForgeError> {
        self.enter(MockOperation::ListRefs {
            prefix: prefix.into(),
        })
        .await?;
        let net = self.net();
        let prefix = normalize_ref(prefix);
        Ok(net
            .repo(&self.full_name)?
            .refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, sha)| RefInfo {
                name: format!("refs/{name}"),
                sha: sha.clone(),
            })
            .collect())
    }

    async fn get_blob(&self, sha: &Oid) -> Result<Vec<u8>, ForgeError> {
        self.enter(MockOperation::GetBlob { sha: sha.clone() })
            .await?;
        self.net()
            .blobs
            .get(sha)
            .cloned()
            .ok_or_else(|| not_found(format!("blob {sha}")))
    }

    async fn get_file(&self, path: &str, git_ref: &str) -> Result<FileContent, ForgeError> {
        self.enter(MockOperation::GetFile {
            path: path.into(),
            git_ref: git_ref.into(),
        })
        .await?;
        let net = self.net();
        let tip = net.resolve(&self.full_name, git_ref)?;
        let sha = net
            .tree_of(&tip)?
            .get(path.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| not_found(format!("{path} at {git_ref}")))?;
        let content = net
            .blobs
            .get(&sha)
            .cloned()
            .ok_or_else(|| not_found(format!("blob {sha}")))?;
        Ok(FileContent { sha, content })
    }

    async fn create_blob(&self, content_base64: &str) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::CreateBlob).await?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(content_base64)
            .map_err(|e| ForgeError::ApiError {
                status: 422,
                message: format!("invalid base64: {e}"),
            })?;
        Ok(self.net().put_blob(bytes))
    }

    async fn create_tree(
        &self,
        base: Option<&Oid>,
        changes: Vec<TreeChange>,
    ) -> Result<Oid, ForgeError> {
        self.enter(MockOperation::CreateTree {
            base: base.cloned(),
            changes: changes.clone(),
        })
        .await?;
        let mut net = self.net();
        let tree = net.apply_changes(base, &changes)?;
        Ok(net.put_tree(tree))
    }

    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError> {
        self.enter(MockOperation::GetCommit { sha: sha.clone() })
            .await?;
        self.net().commit(sha).cloned()
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Commit, ForgeError> {
        self.enter(MockOperation::CreateCommit {
            message: request.message.clone(),
            parents: request.parents.clone(),
        })
        .await?;
        let mut net = self.net();
        net.tree(&request.tree)?;
        for parent in &request.parents {
            net.commit(parent)?;
        }
        Ok(net.put_commit(
            request.tree,
            request.parents,
            request.message,
            request.author,
            request.committer,
        ))
    }

    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, ForgeError> {
        self.enter(MockOperation::Compare {
            base: base.into(),
            head: head.into(),
        })
        .await?;
        let net = self.net();
        let base_sha = net.resolve(&self.full_name, base)?;
        let head_sha = match head.split_once(':') {
            Some(_) => {
                let (repo, spec) = net.head_location(&self.full_name, head);
                net.resolve(&repo, &spec)?
            }
            None => net.resolve(&self.full_name, head)?,
        };
        let (merge_base, commits) = net.merge_base(&base_sha, &head_sha)?;
        let files = MockNetwork::diff(net.tree_of(&merge_base)?, net.tree_of(&head_sha)?);
        Ok(Comparison {
            base_commit: net.commit(&merge_base)?.clone(),
            commits,
            files,
        })
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.enter(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        })
        .await?;
        let mut net = self.net();
        let (head_repo, head_branch) = net.head_location(&self.full_name, &request.head);
        let head_sha = net
            .repos
            .get(&head_repo)
            .and_then(|r| r.refs.get(&format!("heads/{head_branch}")))
            .cloned()
            .ok_or_else(|| ForgeError::ApiError {
                status: 422,
                message: format!("Validation Failed: head {} does not exist", request.head),
            })?;
        let repo = net.repo_mut(&self.full_name)?;
        if !repo.refs.contains_key(&format!("heads/{}", request.base)) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("Validation Failed: base {} does not exist", request.base),
            });
        }
        if repo.prs.values().any(|p| {
            p.state == PrState::Open && p.head_repo == head_repo && p.head_branch == head_branch
        }) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("A pull request already exists for {}", request.head),
            });
        }

        let number = repo.next_pr;
        repo.next_pr += 1;
        let pr = MockPr {
            number,
            state: PrState::Open,
            head_repo,
            head_branch,
            head_sha,
            base: request.base,
            title: request.title,
            body: request.body,
        };
        repo.prs.insert(number, pr.clone());
        Ok(net.view_pr(&self.full_name, &pr))
    }

    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError> {
        self.enter(MockOperation::UpdatePr {
            number: request.number,
            state: request.state,
        })
        .await?;
        let mut net = self.net();
        let current = net
            .repo(&self.full_name)?
            .prs
            .get(&request.number)
            .cloned()
            .ok_or_else(|| not_found(format!("PR #{}", request.number)))?;
        let head_sha = net.view_pr(&self.full_name, &current).head_sha;

        let repo = net.repo_mut(&self.full_name)?;
        let pr = repo
            .prs
            .get_mut(&request.number)
            .ok_or_else(|| not_found(format!("PR #{}", request.number)))?;
        if let Some(title) = request.title {
            pr.title = title;
        }
        if let Some(body) = request.body {
            pr.body = Some(body);
        }
        match request.state {
            Some(PrState::Merged) => {
                return Err(ForgeError::ApiError {
                    status: 422,
                    message: "state must be open or closed".into(),
                })
            }
            Some(_) if pr.state == PrState::Merged => {
                return Err(ForgeError::ApiError {
                    status: 422,
                    message: format!("PR #{} is already merged", pr.number),
                })
            }
            Some(PrState::Closed) => {
                pr.state = PrState::Closed;
                pr.head_sha = head_sha;
            }
            Some(PrState::Open) => pr.state = PrState::Open,
            None => {}
        }
        let pr = pr.clone();
        Ok(net.view_pr(&self.full_name, &pr))
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.enter(MockOperation::GetPr { number }).await?;
        self.pr(number)
            .ok_or_else(|| not_found(format!("PR #{number}")))
    }

    async fn find_pr_by_head(&self, head: &str) -> Result<Option<PullRequest>, ForgeError> {
        self.enter(MockOperation::FindPrByHead { head: head.into() })
            .await?;
        let net = self.net();
        let (head_repo, head_branch) = net.head_location(&self.full_name, head);
        let repo = net.repo(&self.full_name)?;
        Ok(repo
            .prs
            .values()
            .find(|p| {
                p.state == PrState::Open && p.head_repo == head_repo && p.head_branch == head_branch
            })
            .map(|p| net.view_pr(&self.full_name, p)))
    }

    async fn list_prs(&self, opts: ListPullsOpts) -> Result<Vec<PullRequest>, ForgeError> {
        self.enter(MockOperation::ListPrs).await?;
        let net = self.net();
        let head = opts
            .head
            .as_deref()
            .map(|h| net.head_location(&self.full_name, h));
        let repo = net.repo(&self.full_name)?;
        Ok(repo
            .prs
            .values()
            .filter(|p| match opts.state.unwrap_or(PrState::Open) {
                PrState::Open => p.state == PrState::Open,
                // Closed listings include merged PRs, like the REST API.
                PrState::Closed | PrState::Merged => p.state != PrState::Open,
            })
            .filter(|p| opts.base.as_ref().map_or(true, |b| &p.base == b))
            .filter(|p| {
                head.as_ref()
                    .map_or(true, |(r, b)| &p.head_repo == r && &p.head_branch == b)
            })
            .map(|p| net.view_pr(&self.full_name, p))
            .collect())
    }

    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<(), ForgeError> {
        self.enter(MockOperation::MergePr {
            number,
            method: request.method,
        })
        .await?;
        let mut net = self.net();
        net.merge(
            &self.full_name,
            number,
            request.method,
            request.sha.as_ref(),
            true,
        )
    }

    async fn get_statuses(&self, sha: &Oid) -> Result<Vec<CommitStatus>, ForgeError> {
        self.enter(MockOperation::GetStatuses { sha: sha.clone() })
            .await?;
        let net = self.net();
        Ok(net
            .repo(&self.full_name)?
            .statuses
            .get(sha)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MockForge {
        let forge = MockForge::new("octo/blog");
        forge.seed_branch("main", &[("README.md", "hello")]);
        forge
    }

    fn pr_request(head: &str) -> CreatePrRequest {
        CreatePrRequest {
            head: head.into(),
            base: "main".into(),
            title: "Test PR".into(),
            body: None,
        }
    }

    #[tokio::test]
    async fn create_pr_assigns_sequential_numbers() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/a", &main).await.unwrap();
        forge.create_ref("heads/b", &main).await.unwrap();

        let pr1 = forge.create_pr(pr_request("a")).await.unwrap();
        let pr2 = forge.create_pr(pr_request("b")).await.unwrap();

        assert_eq!(pr1.number, 1);
        assert_eq!(pr2.number, 2);
        assert_eq!(pr1.head_repo.as_deref(), Some("octo/blog"));
    }

    #[tokio::test]
    async fn create_pr_requires_existing_head() {
        let forge = seeded();
        let result = forge.create_pr(pr_request("missing")).await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 422, .. })));
    }

    #[tokio::test]
    async fn create_ref_twice_conflicts() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/x", &main).await.unwrap();
        let again = forge.create_ref("heads/x", &main).await;
        assert!(matches!(again, Err(ForgeError::Conflict(_))));
    }

    #[tokio::test]
    async fn non_force_update_must_fast_forward() {
        let forge = seeded();
        let root = forge.ref_sha("heads/main").unwrap();
        let next = forge.commit_files("main", &[("a.md", Some("a"))], "add a");

        let backwards = forge.update_ref("heads/main", &root, false).await;
        assert!(matches!(backwards, Err(ForgeError::Conflict(_))));

        forge.update_ref("heads/main", &root, true).await.unwrap();
        forge.update_ref("heads/main", &next, false).await.unwrap();
        assert_eq!(forge.ref_sha("heads/main"), Some(next));
    }

    #[tokio::test]
    async fn update_missing_ref_is_not_found() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        let result = forge.update_ref("heads/nope", &main, true).await;
        assert!(matches!(result, Err(ForgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn compare_detects_renames() {
        let forge = seeded();
        forge.commit_files("main", &[("a.md", Some("body"))], "add a");
        let base = forge.ref_sha("heads/main").unwrap();
        let main = base.clone();
        forge.create_ref("heads/topic", &main).await.unwrap();
        forge.commit_files("topic", &[("a.md", None), ("b.md", Some("body"))], "rename");

        let cmp = forge.compare(base.as_str(), "topic").await.unwrap();
        assert_eq!(cmp.base_commit.sha, base);
        assert_eq!(cmp.commits.len(), 1);
        assert_eq!(cmp.files.len(), 1);
        assert_eq!(cmp.files[0].status, FileStatus::Renamed);
        assert_eq!(cmp.files[0].filename, "b.md");
        assert_eq!(cmp.files[0].previous_filename.as_deref(), Some("a.md"));
    }

    #[tokio::test]
    async fn merge_requires_base_ancestor() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/topic", &main).await.unwrap();
        forge.commit_files("topic", &[("t.md", Some("t"))], "topic");
        let pr = forge.create_pr(pr_request("topic")).await.unwrap();

        forge.commit_files("main", &[("m.md", Some("m"))], "moved");

        let request = MergeRequest {
            method: MergeMethod::Merge,
            sha: None,
            commit_message: None,
        };
        let result = forge.merge_pr(pr.number, request).await;
        assert!(matches!(result, Err(ForgeError::MergeConflict(_))));
    }

    #[tokio::test]
    async fn merge_checks_expected_sha() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/topic", &main).await.unwrap();
        let pr = forge.create_pr(pr_request("topic")).await.unwrap();
        forge.commit_files("topic", &[("t.md", Some("t"))], "moved head");

        let request = MergeRequest {
            method: MergeMethod::Squash,
            sha: Some(pr.head_sha.clone()),
            commit_message: None,
        };
        let result = forge.merge_pr(pr.number, request).await;
        assert!(matches!(result, Err(ForgeError::ApiError { status: 409, .. })));
    }

    #[tokio::test]
    async fn external_merge_applies_head_changes_onto_moved_base() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/topic", &main).await.unwrap();
        forge.commit_files("topic", &[("t.md", Some("t"))], "topic");
        let pr = forge.create_pr(pr_request("topic")).await.unwrap();
        forge.commit_files("main", &[("m.md", Some("m"))], "moved");

        forge.merge_pr_externally(pr.number).unwrap();

        assert_eq!(forge.pr(pr.number).unwrap().state, PrState::Merged);
        assert_eq!(forge.file_at("main", "t.md").as_deref(), Some("t"));
        assert_eq!(forge.file_at("main", "m.md").as_deref(), Some("m"));
    }

    #[tokio::test]
    async fn fork_shares_objects_and_routes_pr_heads() {
        let upstream = seeded();
        let fork = upstream.fork("alice");
        assert_eq!(fork.full_name(), "alice/blog");

        let sha = fork.commit_files("main", &[("a.md", Some("a"))], "fork work");
        fork.create_ref("heads/cms/alice/blog/posts/a", &sha)
            .await
            .unwrap();

        let pr = upstream
            .create_pr(pr_request("alice:cms/alice/blog/posts/a"))
            .await
            .unwrap();
        assert_eq!(pr.head_repo.as_deref(), Some("alice/blog"));
        assert_eq!(pr.head_sha, sha);

        let found = upstream
            .find_pr_by_head("alice:cms/alice/blog/posts/a")
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.number), Some(pr.number));
    }

    #[tokio::test]
    async fn fail_once_then_succeed() {
        let forge = seeded().fail_on(FailOn::once(Op::GetRef, ForgeError::RateLimited));

        let first = forge.get_ref("heads/main").await;
        assert!(matches!(first, Err(ForgeError::RateLimited)));
        assert!(forge.get_ref("heads/main").await.is_ok());
        assert_eq!(forge.count(Op::GetRef), 2);
    }

    #[tokio::test]
    async fn fail_on_target_only_matches_that_ref() {
        let forge = seeded().fail_on(
            FailOn::always(Op::GetRef, ForgeError::NetworkError("down".into()))
                .on_target("meta/"),
        );
        assert!(forge.get_ref("heads/main").await.is_ok());
        assert!(forge.get_ref("meta/_draftwork").await.is_err());
    }

    #[tokio::test]
    async fn closed_listing_includes_merged() {
        let forge = seeded();
        let main = forge.ref_sha("heads/main").unwrap();
        forge.create_ref("heads/topic", &main).await.unwrap();
        forge.commit_files("topic", &[("t.md", Some("t"))], "topic");
        let pr = forge.create_pr(pr_request("topic")).await.unwrap();
        forge.merge_pr_externally(pr.number).unwrap();

        let open = forge.list_prs(ListPullsOpts::default()).await.unwrap();
        assert!(open.is_empty());
        let closed = forge
            .list_prs(ListPullsOpts {
                state: Some(PrState::Closed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn forge_name() {
        let forge = MockForge::new("octo/blog");
        assert_eq!(forge.name(), "mock");
    }
}
