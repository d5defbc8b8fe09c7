//! Git operations abstraction layer
//!
//! Build stamping needs the checked-out branch and release tagging needs to
//! create and push annotated tags. Both go through the [Repository] trait so
//! the callers can be tested against [mock::MockRepository] instead of a real
//! checkout.
//!
//! - [repository::Git2Repository]: real implementation using the `git2` crate
//! - [mock::MockRepository]: scripted implementation for tests

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::error::Result;

/// Source-control operations used by fw-release.
///
/// All implementors must be `Send + Sync`. Errors from the underlying
/// implementation are mapped to [crate::error::ReleaseError] variants.
pub trait Repository: Send + Sync {
    /// Short name of the branch HEAD points to.
    ///
    /// # Returns
    /// * `Ok(Some(name))` - HEAD is on a branch (e.g. "main", "feature/ota")
    /// * `Ok(None)` - HEAD is detached
    /// * `Err` - If HEAD cannot be resolved
    fn current_branch(&self) -> Result<Option<String>>;

    /// Create an annotated tag on the commit HEAD points to.
    ///
    /// Fails if a tag with the same name already exists.
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push the given tags to a remote.
    ///
    /// # Arguments
    /// * `remote` - Name of the remote (e.g. "origin")
    /// * `tag_names` - Tags to push
    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()>;
}
