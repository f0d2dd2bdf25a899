//! Publish-dependency closure resolution.
//!
//! This module computes, for one submitted path, the complete set of
//! repository paths that must travel with it through approval/publication so
//! the published tree has no dangling references and no orphaned new content.
//! The closure is the union of two independently computed sets:
//!   - The mandatory-parent chain: ancestors of the submission that are
//!     themselves new and would otherwise stay unpublished.
//!   - The transitive dependency closure: referenced paths that are new, plus
//!     updated paths matching the configured dependency patterns.
//!
//! # Major Types
//! - [`DependencyClosureResolver`]: holds the loaded configuration and the
//!   compiled pattern rules for the lifetime of the service
//! - [`ResolveError`]: fatal resolution failures, propagated to the caller
//!
//! # Responsibilities
//! - Queries collaborators fresh on every call; content state is never cached
//!   across resolutions (concurrent authoring can change it at any time)
//! - Bounds the graph walk with a visited accumulator keyed by path, so
//!   dependency cycles terminate and no path is expanded twice
//! - Surfaces every collaborator failure (see tracing events); an incomplete
//!   closure is unsafe to hand to the workflow pipeline
//!
//! # Callable From
//! - The (external) workflow/approval pipeline on submission
//! - Integration tests with mocked collaborators
//!
//! # Navigation
//! - Main entrypoint: [`DependencyClosureResolver::resolve`]

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use tracing::{debug, error, info};

use crate::config::{DependencyRulesConfig, PatternRuleSet, RuleCompileError};
use crate::contract::{ContentState, ContentStore, DependencyOracle, StateOracle, StoreError};

/// The oracle reports edges within this many hops per query; the resolver
/// performs its own multi-hop traversal.
const DIRECT_DEPENDENCY_DEPTH: u32 = 1;

/// Fatal resolution failures. A partial closure must never be submitted, so
/// these propagate to the caller instead of shrinking the result.
#[derive(Debug)]
pub enum ResolveError {
    /// The content store or an oracle could not answer a query that had to be
    /// answered for the closure to be complete.
    CollaboratorUnavailable {
        site: String,
        path: String,
        source: StoreError,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollaboratorUnavailable { site, path, source } => write!(
                f,
                "collaborator unavailable while resolving '{path}' in site '{site}': {source}"
            ),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CollaboratorUnavailable { source, .. } => Some(&**source),
        }
    }
}

fn unavailable(site: &str, path: &str, source: StoreError) -> ResolveError {
    error!(
        site = site,
        path = path,
        error = ?source,
        "Collaborator query failed during dependency resolution"
    );
    ResolveError::CollaboratorUnavailable {
        site: site.to_string(),
        path: path.to_string(),
        source,
    }
}

/// Resolves the publish closure for submitted paths. Holds the rules
/// configuration with its patterns compiled once, at construction.
pub struct DependencyClosureResolver {
    config: DependencyRulesConfig,
    rules: PatternRuleSet,
}

impl DependencyClosureResolver {
    pub fn new(config: DependencyRulesConfig) -> Result<Self, RuleCompileError> {
        let rules = config.compile_rules()?;
        Ok(Self { config, rules })
    }

    /// Compute the set of paths that must accompany `path` on submission.
    ///
    /// The returned set never contains `path` itself and never contains
    /// duplicates. Iteration order is deterministic for test comparison; no
    /// caller relies on a particular order.
    pub async fn resolve<C, D, S>(
        &self,
        site: &str,
        path: &str,
        content: &C,
        dependencies: &D,
        state: &S,
    ) -> Result<BTreeSet<String>, ResolveError>
    where
        C: ContentStore,
        D: DependencyOracle,
        S: StateOracle,
    {
        info!(site = site, path = path, "Resolving publish dependency closure");

        // One shared accumulator: phase 2 must not re-admit or re-expand a
        // path phase 1 already collected.
        let mut accumulated: Vec<String> = Vec::new();

        self.collect_mandatory_parents(site, path, content, &mut accumulated)
            .await?;
        let parent_count = accumulated.len();

        self.collect_transitive_dependencies(site, path, dependencies, state, &mut accumulated)
            .await?;

        debug!(
            site = site,
            path = path,
            mandatory_parents = parent_count,
            transitive_dependencies = accumulated.len() - parent_count,
            "Dependency closure phases complete"
        );

        let closure: BTreeSet<String> = accumulated.into_iter().collect();
        match serde_json::to_string_pretty(&closure) {
            Ok(json) => debug!(site = site, path = path, closure = %json, "Resolved closure as JSON"),
            Err(e) => error!(site = site, path = path, error = ?e, "Failed to serialize resolved closure"),
        }
        Ok(closure)
    }

    /// Phase 1: walk upward from the submission and collect the chain of
    /// ancestors that are themselves new. Publishing a new leaf must never
    /// leave its new containing folders unpublished.
    async fn collect_mandatory_parents<C>(
        &self,
        site: &str,
        path: &str,
        content: &C,
        accumulated: &mut Vec<String>,
    ) -> Result<(), ResolveError>
    where
        C: ContentStore,
    {
        // A folder item is addressed by its index file; stripping the index
        // segment yields the folder itself as the first ancestor candidate.
        let effective = strip_index_suffix(path, &self.config.index_file);
        let mut candidate = if effective.len() != path.len() {
            Some(effective.to_string())
        } else {
            parent_path(effective)
        };

        while let Some(parent) = candidate {
            let exists = content
                .exists(site, &parent)
                .await
                .map_err(|e| unavailable(site, &parent, e))?;
            if !exists {
                break;
            }
            let item = content
                .get_item(site, &parent)
                .await
                .map_err(|e| unavailable(site, &parent, e))?;
            if !item.is_new {
                break;
            }
            debug!(site = site, parent = %item.path, "Mandatory parent collected");
            candidate = parent_path(&item.path);
            accumulated.push(item.path);
        }
        Ok(())
    }

    /// Phase 2: breadth-first walk over dependency edges, expanding only new
    /// paths and updated paths matching the configured patterns. Everything
    /// else is discarded without querying its own dependencies, which keeps
    /// the closure from growing through stable, already-published content.
    async fn collect_transitive_dependencies<D, S>(
        &self,
        site: &str,
        path: &str,
        dependencies: &D,
        state: &S,
        accumulated: &mut Vec<String>,
    ) -> Result<(), ResolveError>
    where
        D: DependencyOracle,
        S: StateOracle,
    {
        let seed = dependencies
            .direct_dependencies(site, path, DIRECT_DEPENDENCY_DEPTH)
            .await
            .map_err(|e| unavailable(site, path, e))?;
        let mut queue: VecDeque<String> = VecDeque::from(seed);

        while let Some(dep) = queue.pop_front() {
            // The submission itself is never part of its own closure, even
            // when a dependency cycle leads back to it.
            if dep == path || accumulated.iter().any(|p| p == &dep) {
                continue;
            }

            let dep_state = classify(site, &dep, state).await?;
            let expand = match dep_state {
                ContentState::New => true,
                ContentState::Updated => self.rules.matches(&dep),
                ContentState::Unchanged => false,
            };
            if !expand {
                debug!(site = site, dependency = %dep, state = ?dep_state, "Dependency discarded");
                continue;
            }

            debug!(site = site, dependency = %dep, state = ?dep_state, "Dependency collected");
            let next = dependencies
                .direct_dependencies(site, &dep, DIRECT_DEPENDENCY_DEPTH)
                .await
                .map_err(|e| unavailable(site, &dep, e))?;
            accumulated.push(dep);
            for candidate in next {
                if !accumulated.iter().any(|p| p == &candidate) {
                    queue.push_back(candidate);
                }
            }
        }
        Ok(())
    }
}

/// Classify a path against the last published baseline. The two oracle
/// queries are mutually exclusive by contract; `is_updated` is only consulted
/// when the path is not new.
async fn classify<S>(site: &str, path: &str, state: &S) -> Result<ContentState, ResolveError>
where
    S: StateOracle,
{
    if state
        .is_new(site, path)
        .await
        .map_err(|e| unavailable(site, path, e))?
    {
        return Ok(ContentState::New);
    }
    if state
        .is_updated(site, path)
        .await
        .map_err(|e| unavailable(site, path, e))?
    {
        return Ok(ContentState::Updated);
    }
    Ok(ContentState::Unchanged)
}

/// Strip a trailing `/<index_file>` segment, yielding the folder the index
/// addresses. Paths not ending in the index segment pass through unchanged.
fn strip_index_suffix<'a>(path: &'a str, index_file: &str) -> &'a str {
    let suffix = format!("/{index_file}");
    if path.len() > suffix.len() && path.ends_with(suffix.as_str()) {
        &path[..path.len() - suffix.len()]
    } else {
        path
    }
}

/// Parent of a slash-delimited path, or `None` at the repository root.
fn parent_path(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        return None;
    }
    Some(trimmed[..idx].to_string())
}
