//! Fixtures shared by unit tests: local bare repositories standing in for
//! destination remotes.

use git2::{Oid, Repository, Signature, Time};
use std::path::Path;

/// Create an empty bare repository under `dir`.
pub fn bare_remote(dir: &Path) -> Repository {
    Repository::init_bare(dir.join("remote.git")).unwrap()
}

/// URL of a local repository usable by fetch/push.
pub fn url_of(repo: &Repository) -> String {
    repo.path().to_string_lossy().into_owned()
}

/// Commit `files` (path, contents) directly onto `refs/heads/<branch>` of a
/// bare repository, on top of the current branch tip if any.
pub fn commit_files(repo: &Repository, branch: &str, files: &[(&str, &str)], message: &str) -> Oid {
    let mut tb = repo.treebuilder(None).unwrap();
    for (path, contents) in files {
        let blob = repo.blob(contents.as_bytes()).unwrap();
        tb.insert(path, blob, 0o100644).unwrap();
    }
    let tree_id = tb.write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let refname = format!("refs/heads/{}", branch);
    let parent = repo
        .find_reference(&refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();

    let sig = Signature::new("Upstream Dev", "dev@example.com", &Time::new(100, 0)).unwrap();
    repo.commit(Some(&refname), &sig, &sig, message, &tree, &parents)
        .unwrap()
}
