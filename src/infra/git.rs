//! Source identity
//!
//! Resolves the commit and branch a release is built from, using the gix crate.

use std::path::Path;

use crate::error::GitError;

/// Length of abbreviated commit ids
pub const SHORT_SHA_LEN: usize = 7;

/// Identity of the checked-out source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    /// Abbreviated HEAD commit id
    pub sha: String,
    /// Full HEAD commit id
    pub sha_long: String,
    /// Release identifier used in artifact names
    pub git_id: String,
    /// Branch name; empty for a detached HEAD without override
    pub branch: String,
}

impl SourceIdentity {
    /// Resolve HEAD of the repository at `repo_path`.
    ///
    /// `branch_override` (usually `BRANCH_NAME` from CI) wins over the
    /// symbolic HEAD.
    pub fn resolve(repo_path: &Path, branch_override: Option<&str>) -> Result<Self, GitError> {
        let repo = gix::open(repo_path).map_err(|e| GitError::InvalidRepository {
            path: repo_path.to_path_buf(),
            error: e.to_string(),
        })?;

        let head_error = |e: &dyn std::fmt::Display| GitError::Head {
            path: repo_path.to_path_buf(),
            error: e.to_string(),
        };
        let commit = repo.head_commit().map_err(|e| head_error(&e))?;
        let id = commit.id();
        let sha_long = id.to_hex().to_string();
        let sha = id.to_hex_with_len(SHORT_SHA_LEN).to_string();

        let branch = match branch_override {
            Some(branch) => branch.to_string(),
            None => repo
                .head_name()
                .map_err(|e| head_error(&e))?
                .map(|name| name.shorten().to_string())
                .unwrap_or_default(),
        };

        tracing::debug!("Source identity: {sha_long} on '{branch}'");
        Ok(Self {
            git_id: sha.clone(),
            sha,
            sha_long,
            branch,
        })
    }

    /// Use `git_id` instead of the abbreviated sha as release identifier
    #[must_use]
    pub fn with_git_id(mut self, git_id: impl Into<String>) -> Self {
        let git_id = git_id.into();
        if !git_id.is_empty() {
            self.git_id = git_id;
        }
        self
    }

    /// Release name `<product>-<git_id>@<branch>`
    pub fn release_name(&self, product: &str) -> String {
        format!("{product}-{}@{}", self.git_id, self.branch)
    }

    /// Contents of the version stamp file
    pub fn version_stamp(&self, product: &str) -> String {
        format!(
            "{product}_sha=\"{}\"\n{product}_id=\"{}\"\n{product}_branch=\"{}\"\n",
            self.sha, self.git_id, self.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn identity() -> SourceIdentity {
        SourceIdentity {
            sha: "abc1234".to_string(),
            sha_long: "abc1234".repeat(5) + "abcde",
            git_id: "abc1234".to_string(),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn test_release_name() {
        assert_eq!(identity().release_name("mepa"), "mepa-abc1234@main");
    }

    #[test]
    fn test_version_stamp() {
        let stamp = identity().version_stamp("mepa");
        assert_eq!(
            stamp,
            "mepa_sha=\"abc1234\"\nmepa_id=\"abc1234\"\nmepa_branch=\"main\"\n"
        );
    }

    #[test]
    fn test_with_git_id_ignores_empty() {
        let id = identity().with_git_id("");
        assert_eq!(id.git_id, "abc1234");
        let id = identity().with_git_id("v2024.03-12-gabc1234");
        assert_eq!(id.release_name("mepa"), "mepa-v2024.03-12-gabc1234@main");
    }

    #[test]
    fn test_resolve_not_a_repository() {
        let temp = TempDir::new().unwrap();
        let result = SourceIdentity::resolve(temp.path(), None);
        assert!(matches!(result, Err(GitError::InvalidRepository { .. })));
    }

    #[test]
    fn test_resolve_local_repository() {
        if which::which("git").is_err() {
            return;
        }
        let temp = TempDir::new().unwrap();
        let git = |args: &[&str]| {
            let status = std::process::Command::new("git")
                .args(args)
                .current_dir(temp.path())
                .env("GIT_AUTHOR_NAME", "t")
                .env("GIT_AUTHOR_EMAIL", "t@example.com")
                .env("GIT_COMMITTER_NAME", "t")
                .env("GIT_COMMITTER_EMAIL", "t@example.com")
                .status()
                .unwrap();
            assert!(status.success());
        };
        git(&["init", "-q", "-b", "feature"]);
        std::fs::write(temp.path().join("README"), "x").unwrap();
        git(&["add", "README"]);
        git(&["commit", "-q", "-m", "init"]);

        let id = SourceIdentity::resolve(temp.path(), None).unwrap();
        assert_eq!(id.branch, "feature");
        assert_eq!(id.sha.len(), SHORT_SHA_LEN);
        assert_eq!(id.sha_long.len(), 40);
        assert!(id.sha_long.starts_with(&id.sha));
        assert_eq!(id.git_id, id.sha);

        let overridden = SourceIdentity::resolve(temp.path(), Some("release-1")).unwrap();
        assert_eq!(overridden.branch, "release-1");
    }

    proptest! {
        #[test]
        fn prop_release_name_contains_parts(
            product in "[a-z]{1,8}",
            git_id in "[0-9a-f]{7}",
            branch in "[a-z0-9._-]{0,12}",
        ) {
            let id = SourceIdentity {
                sha: git_id.clone(),
                sha_long: git_id.clone(),
                git_id: git_id.clone(),
                branch: branch.clone(),
            };
            prop_assert_eq!(id.release_name(&product), format!("{product}-{git_id}@{branch}"));
        }
    }
}
