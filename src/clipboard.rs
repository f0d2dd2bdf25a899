//! Clipboard clip tracking and the recursive copy/move paste engine.
//!
//! A clip records a cut or copy intent on a content subtree; paste replays
//! the recorded ops against the content store at a destination path. A batch
//! is best-effort: one op failing (stale path, store hiccup) must not block
//! unrelated ops, so every per-item failure is logged, recorded in the
//! [`PasteReport`] and excluded from the returned path set. No error escapes
//! the batch.

use std::collections::{BTreeSet, HashMap};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::contract::{ContentStore, StoreError, WorkflowCancellation};

/// A single clipped subtree snapshot pending a paste. `children` is populated
/// only for copy ops whose descendants were themselves clipped, not by a
/// general tree walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardOp {
    pub path: String,
    pub is_cut: bool,
    #[serde(default)]
    pub children: Vec<ClipboardOp>,
}

impl ClipboardOp {
    /// A cut (move) clip of the subtree at `path`.
    pub fn cut(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_cut: true,
            children: Vec::new(),
        }
    }

    /// A copy clip of the subtree at `path`.
    pub fn copy(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_cut: false,
            children: Vec::new(),
        }
    }

    /// A copy clip composed of previously clipped descendants.
    pub fn copy_with_children(path: impl Into<String>, children: Vec<ClipboardOp>) -> Self {
        Self {
            path: path.into(),
            is_cut: false,
            children,
        }
    }
}

/// Pending clips keyed by (site, caller). Each key holds at most one op; a
/// new clip replaces the previous one wholesale, and pasting never touches
/// the slot. Instances are owned by the surrounding session layer.
#[derive(Debug, Default)]
pub struct ClipboardStore {
    slots: HashMap<(String, String), ClipboardOp>,
}

impl ClipboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a clip, replacing whatever the slot held before.
    pub fn clip(&mut self, site: &str, caller: &str, op: ClipboardOp) {
        debug!(
            site = site,
            caller = caller,
            path = %op.path,
            is_cut = op.is_cut,
            "Clipboard slot replaced"
        );
        self.slots
            .insert((site.to_string(), caller.to_string()), op);
    }

    /// The pending clip for this caller, if any.
    pub fn current(&self, site: &str, caller: &str) -> Option<&ClipboardOp> {
        self.slots
            .get(&(site.to_string(), caller.to_string()))
    }

    /// Drop the slot, returning the op it held.
    pub fn clear(&mut self, site: &str, caller: &str) -> Option<ClipboardOp> {
        self.slots
            .remove(&(site.to_string(), caller.to_string()))
    }
}

/// Outcome of one op within a paste batch.
#[derive(Debug, Clone, Serialize)]
pub enum PasteOutcome {
    /// The op landed; `path` is the store-assigned destination path.
    Pasted { path: String },
    /// The op failed and the batch continued without it.
    Failed {
        path: String,
        destination: String,
        is_cut: bool,
        cause: String,
    },
}

/// Per-item outcomes for one paste batch, in op order.
#[derive(Debug, Clone, Serialize)]
pub struct PasteReport {
    pub outcomes: Vec<PasteOutcome>,
}

impl PasteReport {
    /// Destination paths of the ops that succeeded.
    pub fn pasted_paths(&self) -> BTreeSet<String> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                PasteOutcome::Pasted { path } => Some(path.clone()),
                PasteOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, PasteOutcome::Failed { .. }))
            .count()
    }
}

/// Paste a batch of clipboard ops at `destination_path`, returning the
/// realized destination paths of everything that succeeded.
pub async fn paste<C, W>(
    site: &str,
    destination_path: &str,
    ops: Vec<ClipboardOp>,
    content: &C,
    workflow: &W,
) -> BTreeSet<String>
where
    C: ContentStore,
    W: WorkflowCancellation,
{
    paste_report(site, destination_path, ops, content, workflow)
        .await
        .pasted_paths()
}

/// Paste a batch and return the full per-item report. Ops are independent of
/// one another and run concurrently; nodes within one op's subtree are
/// sequential, since each child destination is the parent's new path.
pub async fn paste_report<C, W>(
    site: &str,
    destination_path: &str,
    ops: Vec<ClipboardOp>,
    content: &C,
    workflow: &W,
) -> PasteReport
where
    C: ContentStore,
    W: WorkflowCancellation,
{
    info!(
        site = site,
        destination = destination_path,
        ops_count = ops.len(),
        "Pasting clipboard batch"
    );

    let per_op = join_all(
        ops.into_iter()
            .map(|op| paste_tree(site, destination_path, op, content, workflow)),
    )
    .await;
    let outcomes: Vec<PasteOutcome> = per_op.into_iter().flatten().collect();

    let report = PasteReport { outcomes };
    debug!(
        site = site,
        destination = destination_path,
        pasted = report.pasted_paths().len(),
        failed = report.failure_count(),
        "Clipboard batch complete"
    );
    report
}

/// Replay one op and, for copies, its previously clipped descendants. Each
/// child batch is pasted under the parent's freshly created path, so a
/// composite clip unfolds consistently at its new location.
async fn paste_tree<C, W>(
    site: &str,
    destination: &str,
    op: ClipboardOp,
    content: &C,
    workflow: &W,
) -> Vec<PasteOutcome>
where
    C: ContentStore,
    W: WorkflowCancellation,
{
    let mut outcomes = Vec::new();
    let mut work: Vec<(String, ClipboardOp)> = vec![(destination.to_string(), op)];

    while let Some((dest, op)) = work.pop() {
        match paste_one(site, &dest, &op, content, workflow).await {
            Ok(new_path) => {
                debug!(
                    site = site,
                    path = %op.path,
                    new_path = %new_path,
                    is_cut = op.is_cut,
                    "Pasted item"
                );
                if !op.is_cut {
                    // A moved subtree carries its descendants with it; only
                    // copies unfold their clipped children.
                    for child in op.children {
                        work.push((new_path.clone(), child));
                    }
                }
                outcomes.push(PasteOutcome::Pasted { path: new_path });
            }
            Err(e) => {
                error!(
                    site = site,
                    path = %op.path,
                    destination = %dest,
                    is_cut = op.is_cut,
                    error = ?e,
                    "Paste operation failed for item"
                );
                outcomes.push(PasteOutcome::Failed {
                    path: op.path,
                    destination: dest,
                    is_cut: op.is_cut,
                    cause: e.to_string(),
                });
            }
        }
    }
    outcomes
}

async fn paste_one<C, W>(
    site: &str,
    destination: &str,
    op: &ClipboardOp,
    content: &C,
    workflow: &W,
) -> Result<String, StoreError>
where
    C: ContentStore,
    W: WorkflowCancellation,
{
    if op.is_cut {
        // A pending approval would otherwise keep referencing the old path.
        workflow.cancel_pending(site, &op.path).await?;
        content.move_subtree(site, &op.path, destination).await
    } else {
        content.copy_subtree(site, &op.path, destination).await
    }
}
