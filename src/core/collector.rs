//! Result collection by message passing
//!
//! Workers never touch the result tree directly. Each holds a [`Reporter`] and
//! sends outcomes over a channel to a single collector task that owns the tree,
//! so concurrent reports need no lock and cannot interleave.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::result_tree::{ResultNode, Status};
use crate::error::ReleaseError;

#[derive(Debug)]
enum Report {
    /// Create the root-level group if it does not exist yet
    Open { group: Arc<str> },
    /// Append a node to the root or to a group
    Record {
        group: Option<Arc<str>>,
        node: ResultNode,
    },
}

/// Cloneable handle used to report outcomes to the collector
#[derive(Debug, Clone)]
pub struct Reporter {
    tx: mpsc::UnboundedSender<Report>,
    group: Option<Arc<str>>,
}

impl Reporter {
    /// Append a node to this reporter's target
    pub fn record(&self, node: ResultNode) {
        let report = Report::Record {
            group: self.group.clone(),
            node,
        };
        if self.tx.send(report).is_err() {
            tracing::warn!("Result collector already finished, dropping report");
        }
    }

    /// Append a leaf with the given status
    pub fn record_status(&self, name: impl Into<String>, status: Status) {
        self.record(ResultNode::new(name, status));
    }

    /// Open a root-level group and return a reporter targeting it.
    ///
    /// The group is attached to the root when first opened, so its position in
    /// the report follows the order in which groups are opened.
    pub fn group(&self, name: &str) -> Reporter {
        let group: Arc<str> = Arc::from(name);
        if self
            .tx
            .send(Report::Open {
                group: Arc::clone(&group),
            })
            .is_err()
        {
            tracing::warn!("Result collector already finished, cannot open group '{name}'");
        }
        Reporter {
            tx: self.tx.clone(),
            group: Some(group),
        }
    }

    /// Name of the targeted group, `None` for the root
    pub fn target(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Owner of the result tree while reports are in flight
#[derive(Debug)]
pub struct Collector {
    handle: JoinHandle<ResultNode>,
}

impl Collector {
    /// Start collecting into `root`. Returns the collector and the first reporter.
    pub fn spawn(root: ResultNode) -> (Self, Reporter) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(collect(root, rx));
        (Self { handle }, Reporter { tx, group: None })
    }

    /// Wait for every reporter to be dropped and return the finished tree
    pub async fn finish(self) -> Result<ResultNode, ReleaseError> {
        self.handle
            .await
            .map_err(|e| ReleaseError::Internal(format!("result collector failed: {e}")))
    }
}

async fn collect(mut root: ResultNode, mut rx: mpsc::UnboundedReceiver<Report>) -> ResultNode {
    let mut groups = HashMap::new();
    while let Some(report) = rx.recv().await {
        match report {
            Report::Open { group } => {
                group_index(&mut root, &mut groups, group);
            }
            Report::Record { group: None, node } => root.add_sibling(node),
            Report::Record {
                group: Some(group),
                node,
            } => {
                let index = group_index(&mut root, &mut groups, group);
                root.children[index].add_sibling(node);
            }
        }
    }
    root
}

/// Index of a group opened through [`Reporter::group`]. Leaf steps that happen
/// to share the name are never reused as the group.
fn group_index(root: &mut ResultNode, groups: &mut HashMap<Arc<str>, usize>, group: Arc<str>) -> usize {
    *groups.entry(group).or_insert_with_key(|name| {
        tracing::debug!("Opening result group '{name}'");
        root.add_sibling(ResultNode::group(name.as_ref()));
        root.children.len() - 1
    })
}
