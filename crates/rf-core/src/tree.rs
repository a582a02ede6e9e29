//! # Tree Assembler
//!
//! Builds the display view of a thread: the root, plus every node below it
//! with live counts attached, filtered and ordered for the caller.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::debug;

use crate::aggregate::annotate;
use crate::error::Result;
use crate::models::{AnnotatedNode, Node, NodeId, SortKey, ThreadView};
use crate::traits::{AggregateCalculator, NodeStore};

pub struct TreeAssembler {
    nodes: Arc<dyn NodeStore>,
    aggregates: Arc<dyn AggregateCalculator>,
}

impl TreeAssembler {
    pub fn new(nodes: Arc<dyn NodeStore>, aggregates: Arc<dyn AggregateCalculator>) -> Self {
        Self { nodes, aggregates }
    }

    /// Returns `root_id` and its descendants.
    ///
    /// `search_filter` is matched case-insensitively against content and
    /// author name; an empty filter keeps every node. The root itself is
    /// never part of `descendants`.
    pub async fn thread_view(
        &self,
        root_id: NodeId,
        search_filter: &str,
        sort_key: SortKey,
    ) -> Result<ThreadView> {
        let root = self.nodes.get_node(root_id).await?;
        let needle = search_filter.trim().to_lowercase();

        let subtree = self.nodes.descendants(root_id).await?;
        debug!(%root_id, subtree = subtree.len(), "assembling thread view");

        let mut descendants = Vec::with_capacity(subtree.len());
        for node in subtree {
            if node.id == root_id || !matches_filter(&node, &needle) {
                continue;
            }
            descendants.push(annotate(self.aggregates.as_ref(), node).await?);
        }

        sort_descending(&mut descendants, sort_key);
        Ok(ThreadView { root, descendants })
    }
}

fn matches_filter(node: &Node, needle: &str) -> bool {
    needle.is_empty()
        || node.content.to_lowercase().contains(needle)
        || node.author_name.to_lowercase().contains(needle)
}

/// Orders by the key, newest/highest first; equal keys fall back to id.
pub fn sort_descending(nodes: &mut [AnnotatedNode], key: SortKey) {
    match key {
        SortKey::CreatedAt => nodes.sort_by_key(|n| Reverse((n.node.created_at, n.node.id))),
        SortKey::Likes => nodes.sort_by_key(|n| Reverse((n.counts.likes, n.node.id))),
        SortKey::Dislikes => nodes.sort_by_key(|n| Reverse((n.counts.dislikes, n.node.id))),
    }
}
