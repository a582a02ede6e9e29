//! Aggregate helpers over the [`AggregateCalculator`] port.

use crate::error::Result;
use crate::models::{Aggregates, AnnotatedNode, Node, NodeId};
use crate::traits::AggregateCalculator;

/// Computes like, dislike, and reply counts for one node.
pub async fn aggregates_for(calc: &dyn AggregateCalculator, id: NodeId) -> Result<Aggregates> {
    Ok(Aggregates {
        likes: calc.like_count(id).await?,
        dislikes: calc.dislike_count(id).await?,
        replies: calc.reply_count(id).await?,
    })
}

/// Attaches fresh aggregates to a node.
pub async fn annotate(calc: &dyn AggregateCalculator, node: Node) -> Result<AnnotatedNode> {
    let counts = aggregates_for(calc, node.id).await?;
    Ok(AnnotatedNode { node, counts })
}
