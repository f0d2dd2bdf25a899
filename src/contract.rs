#![allow(unused)]

//! # contract: collaborator interfaces for the authoring core
//!
//! This module defines the traits through which the two core algorithms talk
//! to the surrounding system: the versioned content store, the dependency
//! oracle, the object-state oracle and the workflow pipeline.
//!
//! ## Interface & Extensibility
//! - Implement these traits to plug the core into a concrete store (database,
//!   git-backed repository, in-memory fixture).
//! - All methods are async, returning results and using boxed error types.
//! - Error handling is uniform: collaborator failures return boxed trait
//!   objects; the calling algorithm decides whether a failure is fatal
//!   (resolution) or isolated per item (paste).
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so the integration tests can
//!   generate deterministic mocks, including call-count assertions for paths
//!   that must never be queried.

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Error type for collaborator calls (simple boxed error for now).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Metadata for a single content item as reported by the content store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContentItem {
    /// Store-canonical repository path of the item.
    pub path: String,
    /// Whether the item has never been published.
    pub is_new: bool,
}

/// Publish state of a (site, path) pair relative to the last published
/// baseline. Mutually exclusive; determined by the [`StateOracle`] at query
/// time and never cached by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    New,
    Updated,
    Unchanged,
}

/// Trait for the versioned content store: path existence, item metadata and
/// the subtree copy/move primitives used by clipboard paste.
///
/// `copy_subtree` and `move_subtree` return the store-assigned destination
/// path of the relocated subtree root.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Whether any item exists at `path` in `site`.
    async fn exists(&self, site: &str, path: &str) -> Result<bool, StoreError>;

    /// Fetch the item metadata at `path`.
    async fn get_item(&self, site: &str, path: &str) -> Result<ContentItem, StoreError>;

    /// Copy the subtree rooted at `src` under `dest`, returning the new path.
    async fn copy_subtree(
        &self,
        site: &str,
        src: &str,
        dest: &str,
    ) -> Result<String, StoreError>;

    /// Move the subtree rooted at `src` under `dest`, returning the new path.
    async fn move_subtree(
        &self,
        site: &str,
        src: &str,
        dest: &str,
    ) -> Result<String, StoreError>;
}

/// Trait for the dependency oracle: direct reference edges between paths.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DependencyOracle: Send + Sync {
    /// Paths that `path` references within `depth` hops. The resolver always
    /// queries with depth 1 and performs its own multi-hop traversal.
    async fn direct_dependencies(
        &self,
        site: &str,
        path: &str,
        depth: u32,
    ) -> Result<Vec<String>, StoreError>;
}

/// Trait for the object-state tracker classifying paths against the last
/// published baseline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StateOracle: Send + Sync {
    /// Whether the item at `path` has never been published.
    async fn is_new(&self, site: &str, path: &str) -> Result<bool, StoreError>;

    /// Whether the item at `path` changed since its last published version.
    async fn is_updated(&self, site: &str, path: &str) -> Result<bool, StoreError>;
}

/// Trait for the workflow pipeline hook invoked before a cut/move, so a
/// pending approval does not keep referencing the old path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WorkflowCancellation: Send + Sync {
    /// Cancel any pending workflow state for `path`.
    async fn cancel_pending(&self, site: &str, path: &str) -> Result<(), StoreError>;
}
