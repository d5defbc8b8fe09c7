use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Mock repository for testing without actual git operations
#[derive(Default)]
pub struct MockRepository {
    branch: Option<String>,
    branch_error: bool,
    fail_push: bool,
    tags: Mutex<BTreeSet<String>>,
    tag_messages: Mutex<Vec<(String, String)>>,
    pushes: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockRepository {
    /// Create a mock repository with a detached HEAD and no tags
    pub fn new() -> Self {
        Self::default()
    }

    /// Put HEAD on the given branch
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Make branch queries fail
    pub fn with_branch_error(mut self) -> Self {
        self.branch_error = true;
        self
    }

    /// Add a pre-existing tag
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        self.lock_tags().insert(name.into());
        self
    }

    /// Make every push fail
    pub fn with_push_failure(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Tags created through [Repository::create_annotated_tag], with messages
    pub fn created_tags(&self) -> Vec<(String, String)> {
        self.tag_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Successful pushes as (remote, tags)
    pub fn pushes(&self) -> Vec<(String, Vec<String>)> {
        self.pushes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_tags(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.tags.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<Option<String>> {
        if self.branch_error {
            return Err(ReleaseError::config("not a git repository"));
        }
        Ok(self.branch.clone())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        if !self.lock_tags().insert(name.to_string()) {
            return Err(ReleaseError::tag(format!("Tag '{}' already exists", name)));
        }
        self.tag_messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.to_string(), message.to_string()));
        Ok(())
    }

    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()> {
        if self.fail_push {
            return Err(ReleaseError::remote(format!(
                "Push to '{}' rejected",
                remote
            )));
        }
        self.pushes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((
                remote.to_string(),
                tag_names.iter().map(|t| t.to_string()).collect(),
            ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_repository_branch() {
        let repo = MockRepository::new().with_branch("main");
        assert_eq!(repo.current_branch().unwrap(), Some("main".to_string()));
        assert_eq!(MockRepository::new().current_branch().unwrap(), None);
        assert!(MockRepository::new()
            .with_branch_error()
            .current_branch()
            .is_err());
    }

    #[test]
    fn test_mock_repository_rejects_duplicate_tag() {
        let repo = MockRepository::new().with_tag("v1.0.0");
        assert!(repo.create_annotated_tag("v1.0.0", "Release v1.0.0").is_err());
        repo.create_annotated_tag("v1.0.1", "Release v1.0.1").unwrap();
        assert_eq!(
            repo.created_tags(),
            vec![("v1.0.1".to_string(), "Release v1.0.1".to_string())]
        );
    }

    #[test]
    fn test_mock_repository_records_pushes() {
        let repo = MockRepository::new();
        repo.push_tags("origin", &["v1.0.0"]).unwrap();
        assert_eq!(
            repo.pushes(),
            vec![("origin".to_string(), vec!["v1.0.0".to_string()])]
        );

        let failing = MockRepository::new().with_push_failure();
        assert!(failing.push_tags("origin", &["v1.0.0"]).is_err());
        assert!(failing.pushes().is_empty());
    }
}
