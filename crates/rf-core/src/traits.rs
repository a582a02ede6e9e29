//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! The SQLite plugin implements every storage port on one type; tests
//! mock them one at a time.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ActivityTotals, AnnotatedNode, Classifier, InteractionKind, InteractionState, NewNode, Node,
    NodeId, NodePatch, SavedThread, ThreadQuery, User, UserId,
};

/// Persistence primitives for single nodes and their subtrees.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Persists one node. A duplicate root title is a `Conflict`.
    async fn create_node(&self, node: NewNode) -> Result<NodeId>;
    async fn get_node(&self, id: NodeId) -> Result<Node>;
    async fn get_depth(&self, id: NodeId) -> Result<u32>;
    async fn update_node(&self, id: NodeId, patch: NodePatch) -> Result<()>;
    /// Removes the node, every descendant, and every interaction/save on them.
    async fn delete_node(&self, id: NodeId) -> Result<()>;
    /// All nodes transitively below `root_id`. Never contains the root.
    async fn descendants(&self, root_id: NodeId) -> Result<Vec<Node>>;
    /// Whether any root node already carries this title.
    async fn title_exists(&self, title: &str) -> Result<bool>;
}

/// Derived counts, computed fresh on every call.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AggregateCalculator: Send + Sync {
    async fn like_count(&self, id: NodeId) -> Result<i64>;
    async fn dislike_count(&self, id: NodeId) -> Result<i64>;
    /// Direct children only.
    async fn reply_count(&self, id: NodeId) -> Result<i64>;
}

/// Likes, dislikes, and bookmarks. Independent of node mutation.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Records a like or dislike, atomically replacing the opposite one.
    async fn set_interaction(&self, node: NodeId, user: UserId, kind: InteractionKind) -> Result<()>;
    async fn remove_interaction(&self, node: NodeId, user: UserId, kind: InteractionKind) -> Result<()>;
    async fn interaction_state(&self, node: NodeId, user: UserId) -> Result<InteractionState>;
    async fn save_thread(&self, node: NodeId, user: UserId) -> Result<()>;
    async fn unsave_thread(&self, node: NodeId, user: UserId) -> Result<()>;
    async fn is_saved(&self, node: NodeId, user: UserId) -> Result<bool>;
    async fn saved_threads(&self, user: UserId) -> Result<Vec<SavedThread>>;
}

/// Read-side listings over root nodes and classifiers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadCatalog: Send + Sync {
    /// One page of roots, filtered and sorted as the query asks.
    async fn list_threads(&self, query: &ThreadQuery) -> Result<Vec<AnnotatedNode>>;
    /// Number of roots matching the query's filters, ignoring paging.
    async fn count_threads(&self, query: &ThreadQuery) -> Result<u64>;
    /// Every node written by the user, roots and replies, with counts.
    async fn nodes_by_author(&self, author: UserId) -> Result<Vec<AnnotatedNode>>;
    async fn categories(&self) -> Result<Vec<Classifier>>;
    async fn tags(&self) -> Result<Vec<Classifier>>;
}

/// Account persistence.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// A taken username is a `Conflict`.
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_password(&self, user: UserId, password_hash: &str) -> Result<()>;
    async fn update_bio(&self, user: UserId, bio: &str) -> Result<()>;
    async fn set_admin(&self, user: UserId, is_admin: bool) -> Result<()>;
    /// Counters for one user, or for every user when `user` is `None`.
    async fn activity_totals(&self, user: Option<UserId>) -> Result<Vec<ActivityTotals>>;
}

/// Identity contract: password hashing and bearer tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String>;

    /// Verifies a password against a stored hash. Malformed hashes never verify.
    fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Issues a signed token naming `username`.
    fn issue_token(&self, username: &str) -> Result<String>;

    /// Returns the username a valid, unexpired token was issued for.
    fn verify_token(&self, token: &str) -> Result<String>;
}
