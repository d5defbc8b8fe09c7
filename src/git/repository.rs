use crate::error::{ReleaseError, Result};
use git2::{Repository as Git2Repo, Signature};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Self::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn repo(&self) -> MutexGuard<'_, Git2Repo> {
        self.repo.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn tagger_signature(repo: &Git2Repo) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now("fw-release", "fw-release@localhost")?),
    }
}

/// Credentials callback: SSH keys from ~/.ssh, then the agent, then defaults.
fn credentials(
    username_from_url: Option<&str>,
    allowed_types: git2::CredentialType,
) -> std::result::Result<git2::Cred, git2::Error> {
    let username = username_from_url.unwrap_or("git");

    if allowed_types.contains(git2::CredentialType::SSH_KEY) {
        if let Some(home) = dirs::home_dir() {
            for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let path = home.join(".ssh").join(key);
                if path.exists() {
                    if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                        return Ok(cred);
                    }
                }
            }
        }

        if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
            return Ok(cred);
        }
    }

    git2::Cred::default()
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo();
        if repo.head_detached()? {
            return Ok(None);
        }

        let head = repo.head()?;
        Ok(head.shorthand().map(|s| s.to_string()))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let repo = self.repo();
        let commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| ReleaseError::tag(format!("Cannot resolve HEAD commit: {}", e)))?;
        let signature = tagger_signature(&repo)?;

        repo.tag(name, commit.as_object(), &signature, message, false)
            .map_err(|e| {
                if e.code() == git2::ErrorCode::Exists {
                    ReleaseError::tag(format!("Tag '{}' already exists", name))
                } else {
                    ReleaseError::tag(format!("Cannot create tag '{}': {}", name, e))
                }
            })?;

        Ok(())
    }

    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()> {
        let repo = self.repo();
        let mut remote_handle = repo
            .find_remote(remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            credentials(username_from_url, allowed_types)
        });
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "{} rejected: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspecs: Vec<String> = tag_names
            .iter()
            .map(|tag| format!("refs/tags/{}:refs/tags/{}", tag, tag))
            .collect();
        let refspec_strs: Vec<&str> = refspecs.iter().map(|s| s.as_str()).collect();

        remote_handle
            .push(&refspec_strs, Some(&mut push_options))
            .map_err(|e| match e.class() {
                git2::ErrorClass::Net => {
                    ReleaseError::remote(format!("Network error pushing to '{}': {}", remote, e))
                }
                _ => ReleaseError::remote(format!("Push to '{}' failed: {}", remote, e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use tempfile::TempDir;

    fn init_repo_with_commit(dir: &Path) -> Git2Repo {
        let repo = Git2Repo::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Firmware Bot").unwrap();
            config.set_str("user.email", "bot@example.com").unwrap();
        }
        {
            let sig = repo.signature().unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn test_current_branch_and_detached_head() {
        let dir = TempDir::new().unwrap();
        let raw = init_repo_with_commit(dir.path());
        {
            let head = raw.head().unwrap().peel_to_commit().unwrap();
            raw.branch("feature/ota", &head, false).unwrap();
        }
        raw.set_head("refs/heads/feature/ota").unwrap();

        let repo = Git2Repository::open(dir.path()).unwrap();
        assert_eq!(
            repo.current_branch().unwrap(),
            Some("feature/ota".to_string())
        );

        let oid = raw.head().unwrap().target().unwrap();
        raw.set_head_detached(oid).unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
    }

    #[test]
    fn test_create_annotated_tag_once() {
        let dir = TempDir::new().unwrap();
        let raw = init_repo_with_commit(dir.path());
        let repo = Git2Repository::open(dir.path()).unwrap();

        repo.create_annotated_tag("v01.02.7", "Release v01.02.7")
            .unwrap();

        let tag = raw
            .find_reference("refs/tags/v01.02.7")
            .unwrap()
            .peel_to_tag()
            .unwrap();
        assert_eq!(tag.message(), Some("Release v01.02.7"));

        let err = repo
            .create_annotated_tag("v01.02.7", "Release v01.02.7")
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_push_tags_to_local_remote() {
        let origin_dir = TempDir::new().unwrap();
        let origin = Git2Repo::init_bare(origin_dir.path()).unwrap();

        let dir = TempDir::new().unwrap();
        let raw = init_repo_with_commit(dir.path());
        raw.remote("origin", origin_dir.path().to_str().unwrap())
            .unwrap();

        let repo = Git2Repository::open(dir.path()).unwrap();
        repo.create_annotated_tag("v1.2.11", "Release v1.2.11")
            .unwrap();
        repo.push_tags("origin", &["v1.2.11"]).unwrap();

        assert!(origin.find_reference("refs/tags/v1.2.11").is_ok());
    }

    #[test]
    fn test_push_to_unknown_remote_fails() {
        let dir = TempDir::new().unwrap();
        init_repo_with_commit(dir.path());
        let repo = Git2Repository::open(dir.path()).unwrap();

        let err = repo.push_tags("nowhere", &["v1"]).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
