//! git::rebase
//!
//! Replay the commits of a branch onto a new base, entirely through the
//! hosting API.
//!
//! # Algorithm
//!
//! 1. Compare `onto` with the branch head to get the commits unique to the
//!    branch, oldest first.
//! 2. Nothing to do when there are none, or when the first of them already
//!    sits directly on `onto`.
//! 3. Otherwise fold the commits: diff each against its own first parent,
//!    apply that diff on the previous replayed commit's tree, and commit
//!    with the original message and signatures.
//!
//! The ref is not moved here; the caller force-updates it with the
//! returned head. A failure mid-fold leaves orphaned objects behind, which
//! is harmless.

use thiserror::Error;

use super::objects::{tree_changes_from_diff, ObjectWriter};
use crate::core::types::{BranchName, Oid};
use crate::forge::{Commit, Forge, ForgeError};

#[derive(Debug, Error)]
pub enum RebaseError {
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// A commit unique to the branch has no parent to diff against.
    #[error("cannot replay root commit {0}")]
    RootCommit(Oid),
}

/// What a rebase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Already based on `onto`; carries the current head commit.
    UpToDate(Commit),
    /// Commits were replayed; `head` is the new tip.
    Replayed { head: Commit, replayed: usize },
}

impl RebaseOutcome {
    pub fn head(&self) -> &Commit {
        match self {
            RebaseOutcome::UpToDate(head) => head,
            RebaseOutcome::Replayed { head, .. } => head,
        }
    }

    pub fn into_head(self) -> Commit {
        match self {
            RebaseOutcome::UpToDate(head) => head,
            RebaseOutcome::Replayed { head, .. } => head,
        }
    }
}

pub struct Rebaser<'a> {
    forge: &'a dyn Forge,
}

impl<'a> Rebaser<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    pub async fn rebase(&self, branch: &BranchName, onto: &Oid) -> Result<RebaseOutcome, RebaseError> {
        let head = self.forge.get_ref(&branch.ref_path()).await?;
        let comparison = self.forge.compare(onto.as_str(), head.as_str()).await?;

        let Some(first) = comparison.commits.first() else {
            tracing::debug!(%branch, "no commits to replay");
            let head = self.forge.get_commit(&head).await?;
            return Ok(RebaseOutcome::UpToDate(head));
        };
        if first.parents.first() == Some(onto) {
            tracing::debug!(%branch, %onto, "branch already based on target");
            let head = match comparison.commits.last() {
                Some(last) => last.clone(),
                None => self.forge.get_commit(&head).await?,
            };
            return Ok(RebaseOutcome::UpToDate(head));
        }

        let writer = ObjectWriter::new(self.forge);
        let mut previous = self.forge.get_commit(onto).await?;
        for commit in &comparison.commits {
            let parent = commit
                .parents
                .first()
                .ok_or_else(|| RebaseError::RootCommit(commit.sha.clone()))?;
            let diff = self.forge.compare(parent.as_str(), commit.sha.as_str()).await?;
            let changes = tree_changes_from_diff(&diff.files);

            let tree = if changes.is_empty() {
                previous.tree.clone()
            } else {
                writer.build_tree(Some(&previous.tree), changes).await?
            };
            previous = writer
                .create_commit(
                    &commit.message,
                    &tree,
                    vec![previous.sha.clone()],
                    commit.author.clone(),
                    commit.committer.clone(),
                )
                .await?;
            tracing::debug!(from = %commit.sha.short(7), to = %previous.sha.short(7), "replayed commit");
        }

        Ok(RebaseOutcome::Replayed {
            head: previous,
            replayed: comparison.commits.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{MockForge, Op};

    #[tokio::test]
    async fn branch_on_current_tip_is_up_to_date() {
        let forge = MockForge::new("octo/blog");
        let main = forge.seed_branch("main", &[("README.md", "hi")]);
        forge.create_ref("heads/cms/posts/a", &main).await.unwrap();
        let head = forge.commit_files("cms/posts/a", &[("posts/a.md", Some("a"))], "a");
        forge.clear_operations();

        let branch = BranchName::new("cms/posts/a").unwrap();
        let outcome = Rebaser::new(&forge).rebase(&branch, &main).await.unwrap();

        assert!(matches!(&outcome, RebaseOutcome::UpToDate(c) if c.sha == head));
        assert_eq!(forge.count(Op::CreateCommit), 0);
        assert_eq!(forge.count(Op::CreateTree), 0);
    }

    #[tokio::test]
    async fn replays_onto_moved_base() {
        let forge = MockForge::new("octo/blog");
        let main = forge.seed_branch("main", &[("README.md", "hi")]);
        forge.create_ref("heads/cms/posts/a", &main).await.unwrap();
        forge.commit_files("cms/posts/a", &[("posts/a.md", Some("a"))], "one");
        forge.commit_files("cms/posts/a", &[("posts/a.md", Some("a2"))], "two");
        let moved = forge.commit_files("main", &[("other.md", Some("o"))], "upstream");

        let branch = BranchName::new("cms/posts/a").unwrap();
        let outcome = Rebaser::new(&forge).rebase(&branch, &moved).await.unwrap();

        let RebaseOutcome::Replayed { head, replayed } = outcome else {
            panic!("expected replay");
        };
        assert_eq!(replayed, 2);
        assert_eq!(head.message, "two");
        let first = forge.commit_info(&head.parents[0]).unwrap();
        assert_eq!(first.message, "one");
        assert_eq!(first.parents, vec![moved]);
    }

    #[tokio::test]
    async fn empty_commit_reuses_previous_tree() {
        let forge = MockForge::new("octo/blog");
        let main = forge.seed_branch("main", &[("README.md", "hi")]);
        forge.create_ref("heads/cms/posts/a", &main).await.unwrap();
        forge.commit_files("cms/posts/a", &[], "empty");
        let moved = forge.commit_files("main", &[("other.md", Some("o"))], "upstream");
        forge.clear_operations();

        let branch = BranchName::new("cms/posts/a").unwrap();
        let outcome = Rebaser::new(&forge).rebase(&branch, &moved).await.unwrap();

        let moved_tree = forge.commit_info(&moved).unwrap().tree;
        assert_eq!(outcome.head().tree, moved_tree);
        assert_eq!(forge.count(Op::CreateTree), 0);
        assert_eq!(forge.count(Op::CreateCommit), 1);
    }
}
