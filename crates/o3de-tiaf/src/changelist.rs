//! Change lists: the files created, updated, and deleted between two commits.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use o3de_util::process::run_command;

use crate::error::TiafError;

/// The runtime's change list document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeList {
    #[serde(rename = "createdFiles")]
    pub created_files: Vec<String>,
    #[serde(rename = "updatedFiles")]
    pub updated_files: Vec<String>,
    #[serde(rename = "deletedFiles")]
    pub deleted_files: Vec<String>,
}

impl ChangeList {
    /// Parse `git diff --name-status` output.
    ///
    /// Renames count as a deletion of the old path plus a creation of the
    /// new one; copies create the new path. Unknown status letters are skipped.
    pub fn from_name_status(text: &str) -> Self {
        let mut list = Self::default();
        for line in text.lines() {
            let mut fields = line.split('\t');
            let (Some(status), Some(first)) = (fields.next(), fields.next()) else {
                continue;
            };
            let second = fields.next();
            match (status.chars().next(), second) {
                (Some('A'), _) => list.created_files.push(first.to_owned()),
                (Some('M' | 'T'), _) => list.updated_files.push(first.to_owned()),
                (Some('D'), _) => list.deleted_files.push(first.to_owned()),
                (Some('R'), Some(new)) => {
                    list.deleted_files.push(first.to_owned());
                    list.created_files.push(new.to_owned());
                }
                (Some('C'), Some(new)) => list.created_files.push(new.to_owned()),
                _ => tracing::debug!(line, "skipping unrecognised diff line"),
            }
        }
        list
    }

    pub fn is_empty(&self) -> bool {
        self.created_files.is_empty() && self.updated_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Write the list as `changelist.<uuid>.json` under `dir`.
    ///
    /// # Errors
    /// Returns an error when the file cannot be written.
    pub fn write_unique(&self, dir: &Path) -> Result<PathBuf, TiafError> {
        let path = dir.join(format!("changelist.{}.json", uuid::Uuid::new_v4().simple()));
        o3de_util::json::write_pretty(&path, self)?;
        Ok(path)
    }
}

/// A git checkout the driver diffs against.
#[derive(Debug, Clone)]
pub struct Git {
    repo: PathBuf,
}

impl Git {
    pub fn new(repo: &Path) -> Self {
        Self {
            repo: repo.to_path_buf(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo).args(args);
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<String, TiafError> {
        let output = run_command(&mut self.command(args))?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(TiafError::Git {
                arguments: args.join(" "),
                output: output.text().trim().to_owned(),
            })
        }
    }

    /// Whether `src` is an ancestor of (or equal to) `dst`.
    ///
    /// # Errors
    /// Returns `Git` when either commit is unknown.
    pub fn is_ancestor(&self, src: &str, dst: &str) -> Result<bool, TiafError> {
        let args = ["merge-base", "--is-ancestor", src, dst];
        let output = run_command(&mut self.command(&args))?;
        match output.exit_code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(TiafError::Git {
                arguments: args.join(" "),
                output: output.text().trim().to_owned(),
            }),
        }
    }

    /// Files changed from `src` to `dst`.
    ///
    /// # Errors
    /// Returns `Git` when the diff fails.
    pub fn diff(&self, src: &str, dst: &str) -> Result<ChangeList, TiafError> {
        let text = self.run(&["diff", "--name-status", "-M", src, dst])?;
        Ok(ChangeList::from_name_status(&text))
    }

    /// Files changed on `dst` since it forked from `src` (`src...dst`).
    ///
    /// # Errors
    /// Returns `Git` when the diff fails.
    pub fn multi_branch_diff(&self, src: &str, dst: &str) -> Result<ChangeList, TiafError> {
        let text = self.run(&["diff", "--name-status", "-M", &format!("{src}...{dst}")])?;
        Ok(ChangeList::from_name_status(&text))
    }

    /// Number of commits reachable from `dst` but not from `src`.
    ///
    /// # Errors
    /// Returns `Git` when rev-list fails or prints something other than a count.
    pub fn commit_distance(&self, src: &str, dst: &str) -> Result<u64, TiafError> {
        let range = format!("{src}..{dst}");
        let text = self.run(&["rev-list", "--count", &range])?;
        text.trim().parse().map_err(|_| TiafError::Git {
            arguments: format!("rev-list --count {range}"),
            output: text.trim().to_owned(),
        })
    }
}

/// Build the change list between `src` and `dst`.
///
/// On the source-of-truth branch history must be linear from `src` to
/// `dst`; elsewhere the diff is taken against the common ancestor.
///
/// # Errors
/// Returns `BranchNotDescendant` when a source-of-truth run finds `src`
/// outside the history of `dst`, or `Git` for any git failure.
pub fn build_change_list(git: &Git, src: &str, dst: &str, source_of_truth: bool) -> Result<ChangeList, TiafError> {
    if !source_of_truth {
        return git.multi_branch_diff(src, dst);
    }
    if !git.is_ancestor(src, dst)? {
        return Err(TiafError::BranchNotDescendant {
            src: src.to_owned(),
            dst: dst.to_owned(),
        });
    }
    git.diff(src, dst)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_name_status() {
        let text = "A\tnew.cpp\nM\tCode/a.h\nD\told.cpp\nR087\tsrc/x.cpp\tsrc/y.cpp\nC100\tbase.h\tcopy.h\nT\tlink\nX\tweird\n";
        let list = ChangeList::from_name_status(text);
        assert_eq!(list.created_files, ["new.cpp", "src/y.cpp", "copy.h"]);
        assert_eq!(list.updated_files, ["Code/a.h", "link"]);
        assert_eq!(list.deleted_files, ["old.cpp", "src/x.cpp"]);
    }

    #[test]
    fn serialises_with_runtime_field_names() {
        let list = ChangeList {
            created_files: vec!["a".to_owned()],
            ..ChangeList::default()
        };
        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"createdFiles": ["a"], "updatedFiles": [], "deletedFiles": []})
        );
    }

    #[test]
    fn unique_paths_differ() {
        let tmp = tempfile::tempdir().unwrap();
        let list = ChangeList::default();
        let a = list.write_unique(tmp.path()).unwrap();
        let b = list.write_unique(tmp.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_file() && b.is_file());
    }

    proptest! {
        #[test]
        fn every_path_lands_in_one_list(
            entries in proptest::collection::vec((0usize..3, "[a-z]{1,8}\\.cpp"), 0..20)
        ) {
            let text: String = entries
                .iter()
                .map(|(kind, path)| format!("{}\t{path}\n", ["A", "M", "D"].get(*kind).unwrap()))
                .collect();
            let list = ChangeList::from_name_status(&text);
            let total = list.created_files.len() + list.updated_files.len() + list.deleted_files.len();
            prop_assert_eq!(total, entries.len());
        }
    }

    /// A throwaway repository, or `None` when git is not installed.
    pub(crate) fn git_repo(dir: &Path) -> Option<Git> {
        o3de_util::process::which("git")?;
        let git = Git::new(dir);
        for args in [
            vec!["init", "-q", "-b", "main"],
            vec!["config", "user.email", "ci@example.com"],
            vec!["config", "user.name", "ci"],
            vec!["config", "commit.gpgsign", "false"],
        ] {
            git.run(&args).unwrap();
        }
        Some(git)
    }

    pub(crate) fn commit(git: &Git, dir: &Path, file: &str, contents: &str) -> String {
        std::fs::write(dir.join(file), contents).unwrap();
        git.run(&["add", "-A"]).unwrap();
        git.run(&["commit", "-q", "-m", file]).unwrap();
        git.run(&["rev-parse", "HEAD"]).unwrap().trim().to_owned()
    }

    #[test]
    fn diffs_linear_history() {
        let tmp = tempfile::tempdir().unwrap();
        let Some(git) = git_repo(tmp.path()) else {
            return;
        };
        let first = commit(&git, tmp.path(), "a.cpp", "a");
        std::fs::remove_file(tmp.path().join("a.cpp")).unwrap();
        commit(&git, tmp.path(), "b.cpp", "b");
        let third = commit(&git, tmp.path(), "b.cpp", "bb");

        let list = build_change_list(&git, &first, &third, true).unwrap();
        assert_eq!(list.created_files, ["b.cpp"]);
        assert_eq!(list.deleted_files, ["a.cpp"]);
        assert_eq!(git.commit_distance(&first, &third).unwrap(), 2);
    }

    #[test]
    fn source_of_truth_rejects_diverged_history() {
        let tmp = tempfile::tempdir().unwrap();
        let Some(git) = git_repo(tmp.path()) else {
            return;
        };
        commit(&git, tmp.path(), "a.cpp", "a");
        git.run(&["checkout", "-q", "-b", "feature"]).unwrap();
        let feature = commit(&git, tmp.path(), "f.cpp", "f");
        git.run(&["checkout", "-q", "main"]).unwrap();
        let main = commit(&git, tmp.path(), "m.cpp", "m");

        let err = build_change_list(&git, &feature, &main, true).unwrap_err();
        assert!(matches!(err, TiafError::BranchNotDescendant { .. }));

        // Pull-request style diffs against the fork point instead.
        let list = build_change_list(&git, &main, &feature, false).unwrap();
        assert_eq!(list.created_files, ["f.cpp"]);
    }
}
