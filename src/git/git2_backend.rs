use git2::{
    ConfigLevel, Cred, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository, Signature, Sort, Time, build::CheckoutBuilder,
};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

use super::author::Author;
use super::log::render_medium;
use crate::error::{DestinationError, Result, git};

/// Local ref the last fetched commit is stored under.
pub const FETCHED_HEAD: &str = "refs/gitdest/fetch-head";

/// Namespace fetch candidates land in before one is promoted to [`FETCHED_HEAD`].
const CANDIDATE_PREFIX: &str = "refs/gitdest/candidate/";

/// Build `RemoteCallbacks` with SSH-agent credentials enabled.
///
/// Falls back to default credentials when no agent key is available.
/// With `verbose`, transfer progress and remote sideband output are logged.
fn callbacks_with_creds<'a>(verbose: bool) -> RemoteCallbacks<'a> {
    let mut cb = RemoteCallbacks::new();
    cb.credentials(|_url, username_from_url, _allowed| {
        Cred::ssh_key_from_agent(username_from_url.unwrap_or("git")).or_else(|_| Cred::default())
    });
    if verbose {
        cb.transfer_progress(|p| {
            debug!(
                received = p.received_objects(),
                total = p.total_objects(),
                bytes = p.received_bytes(),
                "transfer progress"
            );
            true
        });
        cb.sideband_progress(|data| {
            debug!(remote = %String::from_utf8_lossy(data).trim_end(), "remote");
            true
        });
    }
    cb
}

/// Qualify a short branch name the way `git push <url> HEAD:<name>` does.
fn qualify_push_ref(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{}", name)
    }
}

/// Remote refs tried for `wanted`, in priority order.
///
/// Qualified names (`refs/...`, `HEAD`) are taken as is; short names resolve
/// to `refs/heads/<wanted>`, then `refs/tags/<wanted>`.
fn candidate_refs(wanted: &str) -> Vec<String> {
    if wanted == "HEAD" || wanted.starts_with("refs/") {
        vec![wanted.to_string()]
    } else {
        vec![
            format!("refs/heads/{}", wanted),
            format!("refs/tags/{}", wanted),
        ]
    }
}

/// Handle on a scratch clone of a destination repository.
///
/// Every handle derived from the same scratch clone (see
/// [`GitRepository::with_work_tree`]) shares its object store and keeps the
/// temporary directory alive; the directory is removed when the last handle
/// drops.
pub struct GitRepository {
    repo: Repository,
    verbose: bool,
    scratch: Option<Arc<TempDir>>,
}

impl GitRepository {
    /// Create an empty repository in a fresh temporary directory.
    ///
    /// When `base` is given the directory is created below it, otherwise in
    /// the system temp dir.
    pub fn init_scratch(base: Option<&Path>, verbose: bool) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gitdest-scratch-");
        let dir = match base {
            Some(b) => {
                fs::create_dir_all(b)?;
                builder.tempdir_in(b)?
            }
            None => builder.tempdir()?,
        };
        let repo = Repository::init(dir.path()).map_err(git("init"))?;
        debug!(path = %dir.path().display(), "initialized scratch clone");
        Ok(GitRepository {
            repo,
            verbose,
            scratch: Some(Arc::new(dir)),
        })
    }

    pub fn work_tree(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Fetch `reference` from `url` and store it under [`FETCHED_HEAD`].
    ///
    /// # Errors
    /// - [`DestinationError::RefNotFound`] when the remote has none of the
    ///   candidate refs (see [`candidate_refs`]).
    /// - [`DestinationError::Git`] for any transport or protocol failure.
    pub fn fetch(&self, url: &str, reference: &str) -> Result<Oid> {
        debug!(url, reference, "git fetch");
        let candidates = candidate_refs(reference);
        let staging: Vec<String> = (0..candidates.len())
            .map(|i| format!("{}{}", CANDIDATE_PREFIX, i))
            .collect();
        let refspecs: Vec<String> = candidates
            .iter()
            .zip(&staging)
            .map(|(src, dst)| format!("+{}:{}", src, dst))
            .collect();

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(callbacks_with_creds(self.verbose));
        let mut remote = self.repo.remote_anonymous(url).map_err(git("fetch"))?;
        remote
            .fetch(refspecs.as_slice(), Some(&mut fo), None)
            .map_err(git("fetch"))?;

        // A refspec whose source the remote lacks is skipped without error,
        // so an absent staging ref means the candidate does not exist.
        let mut found = None;
        for name in &staging {
            if let Ok(mut r) = self.repo.find_reference(name) {
                if found.is_none() {
                    found = r.target();
                }
                r.delete().map_err(git("fetch"))?;
            }
        }
        let target = found.ok_or_else(|| DestinationError::RefNotFound {
            reference: reference.to_string(),
            url: url.to_string(),
        })?;

        self.repo
            .reference(FETCHED_HEAD, target, true, "fetch")
            .map_err(git("fetch"))?;
        self.resolve(FETCHED_HEAD)
    }

    /// Detach HEAD at the fetched commit and force the scratch checkout to it.
    pub fn checkout_fetched_head(&self) -> Result<()> {
        let commit = self
            .repo
            .revparse_single(FETCHED_HEAD)
            .and_then(|o| o.peel_to_commit())
            .map_err(git("checkout"))?;
        debug!(commit = %commit.id(), "git checkout");
        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .map_err(git("checkout"))?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(git("checkout"))?;
        Ok(())
    }

    /// Write `user.name` / `user.email` into this clone's local config.
    ///
    /// Absent or empty values leave the config untouched.
    pub fn set_identity(&self, name: Option<&str>, email: Option<&str>) -> Result<()> {
        let mut cfg = self
            .repo
            .config()
            .and_then(|c| c.open_level(ConfigLevel::Local))
            .map_err(git("config"))?;
        if let Some(n) = name.filter(|n| !n.is_empty()) {
            debug!(name = n, "git config user.name");
            cfg.set_str("user.name", n).map_err(git("config"))?;
        }
        if let Some(e) = email.filter(|e| !e.is_empty()) {
            debug!(email = e, "git config user.email");
            cfg.set_str("user.email", e).map_err(git("config"))?;
        }
        Ok(())
    }

    /// Open a second handle on the same repository using `work_tree` as its
    /// working directory.
    pub fn with_work_tree(&self, work_tree: &Path) -> Result<GitRepository> {
        let repo = Repository::open(self.repo.path()).map_err(git("open"))?;
        repo.set_workdir(work_tree, false).map_err(git("worktree"))?;
        Ok(GitRepository {
            repo,
            verbose: self.verbose,
            scratch: self.scratch.clone(),
        })
    }

    /// `git add --all`: stage additions, modifications and deletions.
    pub fn stage_all(&self) -> Result<()> {
        debug!("git add --all");
        let mut index = self.repo.index().map_err(git("add"))?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(git("add"))?;
        index.update_all(["*"].iter(), None).map_err(git("add"))?;
        index.write().map_err(git("add"))?;
        Ok(())
    }

    /// Commit the staged tree on top of HEAD (if any).
    ///
    /// The author date is `timestamp` seconds since the epoch at `+0000`.
    /// The committer is built from this clone's local `user.name` and
    /// `user.email`, each falling back to the author's value when unset.
    pub fn commit(&self, author: &Author, timestamp: i64, message: &str) -> Result<Oid> {
        let mut index = self.repo.index().map_err(git("commit"))?;
        let tree_id = index.write_tree().map_err(git("commit"))?;
        let tree = self.repo.find_tree(tree_id).map_err(git("commit"))?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(git("commit"))?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(git("commit")(e)),
        };
        let unchanged = match &parent {
            Some(p) => p.tree_id() == tree_id,
            None => tree.len() == 0,
        };
        if unchanged {
            return Err(DestinationError::NothingToCommit);
        }

        let when = Time::new(timestamp, 0);
        let author_sig = Signature::new(&author.name, &author.email, &when).map_err(git("commit"))?;
        let committer = self.committer(author)?;
        let message = git2::message_prettify(message, None).map_err(git("commit"))?;

        let parents: Vec<_> = parent.iter().collect();
        let id = self
            .repo
            .commit(Some("HEAD"), &author_sig, &committer, &message, &tree, &parents)
            .map_err(git("commit"))?;
        debug!(commit = %id, author = %author, "git commit");
        Ok(id)
    }

    /// Committer signature dated now, from the local identity set by
    /// [`GitRepository::set_identity`] with per-field author fallback.
    fn committer(&self, author: &Author) -> Result<Signature<'static>> {
        let cfg = self
            .repo
            .config()
            .and_then(|c| c.open_level(ConfigLevel::Local))
            .map_err(git("config"))?;
        let local = |key: &str| cfg.get_string(key).ok().filter(|v| !v.is_empty());
        let name = local("user.name").unwrap_or_else(|| author.name.clone());
        let email = local("user.email").unwrap_or_else(|| author.email.clone());
        Signature::now(&name, &email).map_err(git("commit"))
    }

    /// Push `local` (a ref name such as `HEAD`) to `remote_ref` on `url`.
    ///
    /// # Errors
    /// [`DestinationError::PushRejected`] when the remote refuses the update,
    /// e.g. because it is not a fast-forward.
    pub fn push(&self, url: &str, local: &str, remote_ref: &str) -> Result<()> {
        let dst = qualify_push_ref(remote_ref);
        let refspec = format!("{}:{}", local, dst);
        debug!(url, refspec = %refspec, "git push");

        let rejected: RefCell<Option<String>> = RefCell::new(None);
        {
            let mut cb = callbacks_with_creds(self.verbose);
            cb.push_update_reference(|_name, status| {
                if let Some(msg) = status {
                    *rejected.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });
            let mut po = PushOptions::new();
            po.remote_callbacks(cb);

            let mut remote = self.repo.remote_anonymous(url).map_err(git("push"))?;
            remote
                .push(&[refspec.as_str()], Some(&mut po))
                .map_err(git("push"))?;
        }

        match rejected.into_inner() {
            Some(message) => Err(DestinationError::PushRejected {
                reference: dst,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Resolve a revision expression to the commit it points to.
    pub fn resolve(&self, expr: &str) -> Result<Oid> {
        let commit = self
            .repo
            .revparse_single(expr)
            .and_then(|o| o.peel_to_commit())
            .map_err(git("rev-parse"))?;
        Ok(commit.id())
    }

    /// Textual `git log <commit> -<limit>` output, most recent first.
    pub fn read_log(&self, commit: Oid, limit: usize) -> Result<String> {
        let mut walk = self.repo.revwalk().map_err(git("log"))?;
        walk.set_sorting(Sort::TIME).map_err(git("log"))?;
        walk.push(commit).map_err(git("log"))?;

        let mut out = String::new();
        for (i, oid) in walk.take(limit).enumerate() {
            let oid = oid.map_err(git("log"))?;
            let c = self.repo.find_commit(oid).map_err(git("log"))?;
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&render_medium(&c));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bare_remote, commit_files, url_of};
    use std::fs;
    use tempfile::tempdir;

    fn author() -> Author {
        "Copy Bot <bot@example.com>".parse().unwrap()
    }

    #[test]
    fn qualify_push_ref_prefixes_short_names() {
        assert_eq!(qualify_push_ref("master"), "refs/heads/master");
        assert_eq!(qualify_push_ref("refs/for/master"), "refs/for/master");
    }

    #[test]
    fn candidate_refs_try_heads_then_tags_for_short_names() {
        assert_eq!(
            candidate_refs("v1"),
            vec!["refs/heads/v1".to_string(), "refs/tags/v1".to_string()]
        );
        assert_eq!(candidate_refs("refs/for/main"), vec!["refs/for/main"]);
        assert_eq!(candidate_refs("HEAD"), vec!["HEAD"]);
    }

    #[test]
    fn fetch_missing_branch_next_to_existing_one_is_not_found() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        commit_files(&remote, "develop", &[("a.txt", "a")], "first");

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        let err = scratch.fetch(&url_of(&remote), "master").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RefNotFound);
        assert!(scratch.repo.find_reference(FETCHED_HEAD).is_err());
    }

    #[test]
    fn fetch_prefers_branch_over_tag_and_falls_back_to_tag() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        let branch_tip = commit_files(&remote, "v1", &[("a.txt", "branch")], "branch");
        let tagged = commit_files(&remote, "other", &[("a.txt", "tag")], "tagged");
        remote
            .reference("refs/tags/v1", tagged, false, "tag")
            .unwrap();
        remote
            .reference("refs/tags/v2", tagged, false, "tag")
            .unwrap();

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        assert_eq!(scratch.fetch(&url_of(&remote), "v1").unwrap(), branch_tip);
        assert_eq!(scratch.fetch(&url_of(&remote), "v2").unwrap(), tagged);
        assert!(
            scratch
                .repo
                .find_reference(&format!("{}0", CANDIDATE_PREFIX))
                .is_err()
        );
    }

    #[test]
    fn fetch_reports_missing_ref_as_not_found() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        let scratch = GitRepository::init_scratch(None, false).unwrap();

        let err = scratch.fetch(&url_of(&remote), "master").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RefNotFound);
    }

    #[test]
    fn fetch_stores_commit_under_marker() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        let tip = commit_files(&remote, "master", &[("a.txt", "a")], "first");

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        let fetched = scratch.fetch(&url_of(&remote), "master").unwrap();
        assert_eq!(fetched, tip);
        assert_eq!(scratch.resolve(FETCHED_HEAD).unwrap(), tip);
    }

    #[test]
    fn scratch_dir_is_removed_after_last_handle() {
        let td = tempdir().unwrap();
        let base = td.path().join("scratch");
        let work = td.path().join("work");
        fs::create_dir_all(&work).unwrap();

        let scratch = GitRepository::init_scratch(Some(&base), false).unwrap();
        let root = scratch.work_tree().unwrap().to_path_buf();
        assert!(root.starts_with(&base));

        let bound = scratch.with_work_tree(&work).unwrap();
        drop(scratch);
        assert!(root.exists());
        drop(bound);
        assert!(!root.exists());
    }

    #[test]
    fn commit_on_bound_work_tree_stages_deletions() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        commit_files(
            &remote,
            "master",
            &[("keep.txt", "old"), ("gone.txt", "bye")],
            "baseline",
        );

        let work = td.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("keep.txt"), "new").unwrap();
        fs::write(work.join("added.txt"), "hi").unwrap();

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        scratch.fetch(&url_of(&remote), "master").unwrap();
        scratch.checkout_fetched_head().unwrap();
        let bound = scratch.with_work_tree(&work).unwrap();
        bound.stage_all().unwrap();
        let id = bound.commit(&author(), 1000, "update").unwrap();

        let commit = bound.repo.find_commit(id).unwrap();
        let tree = commit.tree().unwrap();
        assert!(tree.get_name("keep.txt").is_some());
        assert!(tree.get_name("added.txt").is_some());
        assert!(tree.get_name("gone.txt").is_none());
        assert_eq!(commit.parent_count(), 1);
        assert_eq!(commit.author().when().seconds(), 1000);
        assert_eq!(commit.author().when().offset_minutes(), 0);
        assert_eq!(commit.author().name(), Some("Copy Bot"));
        assert_eq!(commit.message(), Some("update\n"));
    }

    #[test]
    fn commit_refuses_unchanged_tree() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        commit_files(&remote, "master", &[("a.txt", "a")], "baseline");

        let work = td.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("a.txt"), "a").unwrap();

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        scratch.fetch(&url_of(&remote), "master").unwrap();
        scratch.checkout_fetched_head().unwrap();
        let bound = scratch.with_work_tree(&work).unwrap();
        bound.stage_all().unwrap();
        let err = bound.commit(&author(), 1, "noop").unwrap_err();
        assert!(matches!(err, DestinationError::NothingToCommit));
    }

    #[test]
    fn committer_identity_comes_from_local_config() {
        let td = tempdir().unwrap();
        let work = td.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("a.txt"), "a").unwrap();

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        scratch
            .set_identity(Some("Release Robot"), Some("robot@example.com"))
            .unwrap();
        let bound = scratch.with_work_tree(&work).unwrap();
        bound.stage_all().unwrap();
        let id = bound.commit(&author(), 5, "root").unwrap();

        let commit = bound.repo.find_commit(id).unwrap();
        assert_eq!(commit.parent_count(), 0);
        assert_eq!(commit.committer().name(), Some("Release Robot"));
        assert_eq!(commit.committer().email(), Some("robot@example.com"));
        assert_eq!(commit.author().email(), Some("bot@example.com"));
    }

    #[test]
    fn partial_committer_identity_falls_back_per_field() {
        for (name, email, want_name, want_email) in [
            (Some("Release Robot"), None, "Release Robot", "bot@example.com"),
            (None, Some("robot@example.com"), "Copy Bot", "robot@example.com"),
            (None, None, "Copy Bot", "bot@example.com"),
        ] {
            let td = tempdir().unwrap();
            let work = td.path().join("work");
            fs::create_dir_all(&work).unwrap();
            fs::write(work.join("a.txt"), "a").unwrap();

            let scratch = GitRepository::init_scratch(None, false).unwrap();
            scratch.set_identity(name, email).unwrap();
            let bound = scratch.with_work_tree(&work).unwrap();
            bound.stage_all().unwrap();
            let id = bound.commit(&author(), 5, "root").unwrap();

            let commit = bound.repo.find_commit(id).unwrap();
            assert_eq!(commit.committer().name(), Some(want_name));
            assert_eq!(commit.committer().email(), Some(want_email));
        }
    }

    #[test]
    fn push_then_read_log() {
        let td = tempdir().unwrap();
        let remote = bare_remote(td.path());
        let work = td.path().join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(work.join("a.txt"), "a").unwrap();

        let scratch = GitRepository::init_scratch(None, false).unwrap();
        let bound = scratch.with_work_tree(&work).unwrap();
        bound.stage_all().unwrap();
        let id = bound
            .commit(&author(), 1000, "subject\n\nbody line\n")
            .unwrap();
        bound.push(&url_of(&remote), "HEAD", "main").unwrap();

        let pushed = remote
            .find_reference("refs/heads/main")
            .unwrap()
            .target()
            .unwrap();
        assert_eq!(pushed, id);

        let log = bound.read_log(id, 1).unwrap();
        let expected = format!(
            "commit {}\nAuthor: Copy Bot <bot@example.com>\nDate:   Thu Jan 1 00:16:40 1970 +0000\n\n    subject\n\n    body line\n",
            id
        );
        assert_eq!(log, expected);
    }
}
