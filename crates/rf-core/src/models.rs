//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Forum.
//! Threads and comments share one table and one type: a [`Node`] whose
//! [`NodeKind`] says whether it is a root (thread) or a reply (comment).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagination::PageRequest;

/// Storage-assigned identifier of a node (thread or comment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

/// Storage-assigned identifier of a registered user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a node is, and the fields that only make sense for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// A thread. Depth is always 0.
    Root {
        title: String,
        category: Option<String>,
        tag: Option<String>,
    },
    /// A comment on a thread or on another comment.
    Reply { parent_id: NodeId, depth: u32 },
}

/// The fundamental unit of conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub content: String,
    pub author_id: UserId,
    /// Username of the author, resolved by the store for display and search
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub fn depth(&self) -> u32 {
        match self.kind {
            NodeKind::Root { .. } => 0,
            NodeKind::Reply { depth, .. } => depth,
        }
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Root { .. } => None,
            NodeKind::Reply { parent_id, .. } => Some(parent_id),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Root { title, .. } => Some(title),
            NodeKind::Reply { .. } => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root { .. })
    }
}

/// A node that has passed the write guard and is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub kind: NodeKind,
    pub content: String,
    pub author_id: UserId,
}

impl NewNode {
    pub fn root(
        title: impl Into<String>,
        content: impl Into<String>,
        author_id: UserId,
        category: Option<String>,
        tag: Option<String>,
    ) -> Self {
        Self {
            kind: NodeKind::Root {
                title: title.into(),
                category,
                tag,
            },
            content: content.into(),
            author_id,
        }
    }

    pub fn reply(parent_id: NodeId, depth: u32, content: impl Into<String>, author_id: UserId) -> Self {
        Self {
            kind: NodeKind::Reply { parent_id, depth },
            content: content.into(),
            author_id,
        }
    }
}

/// Partial update: only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Derived counts for a node. Never stored, always computed from related rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregates {
    pub likes: i64,
    pub dislikes: i64,
    pub replies: i64,
}

/// A node together with its live aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(flatten)]
    pub counts: Aggregates,
}

/// Display-ready view of a root and its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadView {
    pub root: Node,
    /// Every transitive descendant of `root`, never `root` itself.
    pub descendants: Vec<AnnotatedNode>,
}

/// Ordering applied to the descendants of a thread view. Always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Likes,
    Dislikes,
}

impl SortKey {
    /// Unknown keys fall back to creation time.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "likes" => SortKey::Likes,
            "dislikes" => SortKey::Dislikes,
            _ => SortKey::CreatedAt,
        }
    }
}

/// Ordering applied to the thread list. Always descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSort {
    #[default]
    CreatedAt,
    Likes,
    Dislikes,
    Comments,
}

impl ThreadSort {
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "likes" => ThreadSort::Likes,
            "dislikes" => ThreadSort::Dislikes,
            "comments" => ThreadSort::Comments,
            _ => ThreadSort::CreatedAt,
        }
    }
}

/// Filters and paging for the thread list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadQuery {
    /// Substring matched against title or content
    pub search: String,
    pub sort: ThreadSort,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Dislike,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Dislike => "dislike",
        }
    }
}

/// Whether a given user currently likes or dislikes a node. Never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub liked: bool,
    pub disliked: bool,
}

/// A bookmarked root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedThread {
    pub id: NodeId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Named category or tag attached to a root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub id: i64,
    pub name: String,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub bio: String,
    pub created_at: DateTime<Utc>,
}

/// Publicly visible profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: UserId,
    pub username: String,
    pub join_date: DateTime<Utc>,
    pub role: String,
    pub bio: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            join_date: user.created_at,
            role: if user.is_admin { "Admin" } else { "Regular User" }.to_string(),
            bio: user.bio.clone(),
        }
    }
}

/// Raw per-user counters the store aggregates; scores are derived from these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTotals {
    pub user_id: UserId,
    pub username: String,
    pub threads: i64,
    pub comments: i64,
    /// Likes received on the user's root nodes
    pub thread_likes: i64,
    /// Likes received on the user's replies
    pub comment_likes: i64,
    pub dislikes_received: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub threads_created: i64,
    pub comments_made: i64,
    pub likes_received: i64,
    pub dislikes_received: i64,
}

impl From<&ActivityTotals> for UserMetrics {
    fn from(totals: &ActivityTotals) -> Self {
        Self {
            threads_created: totals.threads,
            comments_made: totals.comments,
            likes_received: totals.thread_likes + totals.comment_likes,
            dislikes_received: totals.dislikes_received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserScores {
    pub user_id: UserId,
    pub username: String,
    pub threads_score: f64,
    pub comments_score: f64,
    pub contribution_score: f64,
}

/// Everything a user has written, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub threads: Vec<AnnotatedNode>,
    pub comments: Vec<AnnotatedNode>,
}
