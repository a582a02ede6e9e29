//! # Forum Service
//!
//! Orchestrates the ports for every use case the HTTP layer exposes.
//! Identity has already been resolved by the caller; operations that need
//! an actor take the authenticated [`User`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::aggregate::{aggregates_for, annotate};
use crate::error::{AppError, Result};
use crate::guard::{ContentPolicy, WriteGuard};
use crate::models::{
    ActivityTotals, Aggregates, AnnotatedNode, Classifier, InteractionKind, InteractionState, NewNode, Node, NodeId,
    NodePatch, SavedThread, SortKey, ThreadQuery, ThreadView, User, UserActivity, UserId, UserInfo,
    UserMetrics, UserScores,
};
use crate::pagination::Page;
use crate::scores;
use crate::traits::{
    AggregateCalculator, AuthProvider, InteractionStore, NodeStore, ThreadCatalog, UserStore,
};
use crate::tree::TreeAssembler;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 8;
const BIO_MAX: usize = 500;

/// Input for a new root node.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct NewThread {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

/// The set of ports a service is assembled from.
pub struct Ports {
    pub nodes: Arc<dyn NodeStore>,
    pub aggregates: Arc<dyn AggregateCalculator>,
    pub interactions: Arc<dyn InteractionStore>,
    pub catalog: Arc<dyn ThreadCatalog>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Ports {
    /// Uses one backend for every storage port.
    pub fn from_backend<B>(backend: Arc<B>, auth: Arc<dyn AuthProvider>) -> Self
    where
        B: NodeStore + AggregateCalculator + InteractionStore + ThreadCatalog + UserStore + 'static,
    {
        Self {
            nodes: backend.clone(),
            aggregates: backend.clone(),
            interactions: backend.clone(),
            catalog: backend.clone(),
            users: backend,
            auth,
        }
    }
}

pub struct ForumService {
    nodes: Arc<dyn NodeStore>,
    aggregates: Arc<dyn AggregateCalculator>,
    interactions: Arc<dyn InteractionStore>,
    catalog: Arc<dyn ThreadCatalog>,
    users: Arc<dyn UserStore>,
    auth: Arc<dyn AuthProvider>,
    guard: WriteGuard,
    tree: TreeAssembler,
}

impl ForumService {
    pub fn new(ports: Ports, policy: ContentPolicy) -> Self {
        Self {
            guard: WriteGuard::new(ports.nodes.clone(), policy),
            tree: TreeAssembler::new(ports.nodes.clone(), ports.aggregates.clone()),
            nodes: ports.nodes,
            aggregates: ports.aggregates,
            interactions: ports.interactions,
            catalog: ports.catalog,
            users: ports.users,
            auth: ports.auth,
        }
    }

    pub fn policy(&self) -> &ContentPolicy {
        self.guard.policy()
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    pub async fn register(&self, username: &str, password: &str) -> Result<UserId> {
        let mut errors = Vec::new();
        let name_len = username.chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&name_len) {
            errors.push(format!(
                "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters long"
            ));
        }
        if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push("Username may only contain letters, digits and underscores".to_string());
        }
        if password.chars().count() < PASSWORD_MIN {
            errors.push(format!("Password must be at least {PASSWORD_MIN} characters long"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists".into()));
        }
        let hash = self.auth.hash_password(password)?;
        let id = self.users.create_user(username, &hash).await?;
        info!(user_id = %id, username, "user registered");
        Ok(id)
    }

    /// Returns a bearer token for valid credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid username or password".into()))?;
        if !self.auth.verify_password(password, &user.password_hash) {
            warn!(username, "login rejected");
            return Err(AppError::Unauthorized("Invalid username or password".into()));
        }
        self.auth.issue_token(&user.username)
    }

    /// Resolves a bearer token to the account it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let username = self.auth.verify_token(token)?;
        self.users
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid token claims".into()))
    }

    pub async fn change_password(&self, user: &User, current: &str, new: &str) -> Result<()> {
        if !self.auth.verify_password(current, &user.password_hash) {
            return Err(AppError::Unauthorized("Current password is incorrect".into()));
        }
        if new.chars().count() < PASSWORD_MIN {
            return Err(AppError::invalid(format!(
                "Password must be at least {PASSWORD_MIN} characters long"
            )));
        }
        let hash = self.auth.hash_password(new)?;
        self.users.update_password(user.id, &hash).await
    }

    pub async fn update_bio(&self, user: &User, bio: &str) -> Result<()> {
        if bio.chars().count() > BIO_MAX {
            return Err(AppError::invalid(format!(
                "Bio must be no more than {BIO_MAX} characters long"
            )));
        }
        self.users.update_bio(user.id, bio).await
    }

    pub async fn user_info(&self, username: &str) -> Result<UserInfo> {
        Ok(UserInfo::from(&self.require_user(username).await?))
    }

    /// Grants or revokes admin rights. Only admins may do this.
    pub async fn set_admin(&self, actor: &User, username: &str, is_admin: bool) -> Result<()> {
        if !actor.is_admin {
            return Err(AppError::Forbidden("Only admins can change roles".into()));
        }
        let target = self.require_user(username).await?;
        self.users.set_admin(target.id, is_admin).await?;
        info!(actor = %actor.username, target = %target.username, is_admin, "role changed");
        Ok(())
    }

    /// Registers `username` if it does not exist yet and grants it admin
    /// rights. Safe to call on every startup.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<UserId> {
        let id = match self.users.find_by_username(username).await? {
            Some(user) if user.is_admin => return Ok(user.id),
            Some(user) => user.id,
            None => self.register(username, password).await?,
        };
        self.users.set_admin(id, true).await?;
        info!(username, "bootstrap admin ready");
        Ok(id)
    }

    pub async fn user_metrics(&self, username: &str) -> Result<UserMetrics> {
        let totals = self.totals_for(username).await?;
        Ok(UserMetrics::from(&totals))
    }

    pub async fn user_scores(&self, username: &str) -> Result<UserScores> {
        let totals = self.totals_for(username).await?;
        Ok(scores::score(&totals))
    }

    pub async fn leaderboard(&self) -> Result<Vec<UserScores>> {
        let totals = self.users.activity_totals(None).await?;
        Ok(scores::leaderboard(&totals))
    }

    pub async fn user_activity(&self, username: &str) -> Result<UserActivity> {
        let user = self.require_user(username).await?;
        let (threads, comments): (Vec<AnnotatedNode>, Vec<AnnotatedNode>) = self
            .catalog
            .nodes_by_author(user.id)
            .await?
            .into_iter()
            .partition(|n| n.node.is_root());
        Ok(UserActivity { threads, comments })
    }

    pub async fn saved_threads(&self, user: &User) -> Result<Vec<SavedThread>> {
        self.interactions.saved_threads(user.id).await
    }

    // ── Threads and comments ────────────────────────────────────────────────

    pub async fn list_threads(&self, query: &ThreadQuery) -> Result<Page<AnnotatedNode>> {
        let total = self.catalog.count_threads(query).await?;
        let items = self.catalog.list_threads(query).await?;
        Ok(Page::new(items, query.page, total))
    }

    pub async fn thread_view(&self, id: NodeId, search: &str, sort: SortKey) -> Result<ThreadView> {
        self.tree.thread_view(id, search, sort).await
    }

    pub async fn node(&self, id: NodeId) -> Result<AnnotatedNode> {
        let node = self.nodes.get_node(id).await?;
        annotate(self.aggregates.as_ref(), node).await
    }

    pub async fn create_thread(&self, author: &User, input: NewThread) -> Result<NodeId> {
        let policy = self.guard.policy();
        let mut errors = self.guard.validate_title(input.title.as_deref(), false).await?;
        errors.extend(
            self.guard
                .validate_content(input.content.as_deref().unwrap_or_default(), policy.thread_content),
        );
        if !errors.is_empty() {
            warn!(author = %author.username, ?errors, "thread rejected");
            return Err(AppError::Validation(errors));
        }

        let (Some(title), Some(content)) = (input.title, input.content) else {
            return Err(AppError::invalid("Title and content are required"));
        };
        let id = self
            .nodes
            .create_node(NewNode::root(
                title,
                content,
                author.id,
                non_blank(input.category),
                non_blank(input.tag),
            ))
            .await?;
        info!(node_id = %id, author = %author.username, "thread created");
        Ok(id)
    }

    pub async fn reply(&self, author: &User, parent_id: NodeId, content: &str) -> Result<NodeId> {
        let errors = self
            .guard
            .validate_content(content, self.guard.policy().reply_content);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let depth = self.guard.prepare_reply(parent_id).await?;
        let id = self
            .nodes
            .create_node(NewNode::reply(parent_id, depth, content, author.id))
            .await?;
        info!(node_id = %id, %parent_id, depth, author = %author.username, "reply created");
        Ok(id)
    }

    /// Applies a partial edit. Roots may change title and content, replies
    /// only content.
    pub async fn update_node(&self, actor: &User, id: NodeId, patch: NodePatch) -> Result<()> {
        let node = self.require_modifiable(actor, id).await?;
        if patch.is_empty() {
            return Err(AppError::invalid("Nothing to update"));
        }

        let policy = self.guard.policy();
        let mut errors = Vec::new();
        if node.is_root() {
            errors.extend(self.guard.validate_title(patch.title.as_deref(), true).await?);
        } else if patch.title.is_some() {
            errors.push("Comments cannot have a title".to_string());
        }
        if let Some(content) = &patch.content {
            let bounds = if node.is_root() {
                policy.thread_content
            } else {
                policy.reply_content
            };
            errors.extend(self.guard.validate_content(content, bounds));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        self.nodes.update_node(id, patch).await?;
        info!(node_id = %id, actor = %actor.username, "node updated");
        Ok(())
    }

    pub async fn delete_node(&self, actor: &User, id: NodeId) -> Result<()> {
        self.require_modifiable(actor, id).await?;
        self.nodes.delete_node(id).await?;
        info!(node_id = %id, actor = %actor.username, "node deleted with its subtree");
        Ok(())
    }

    /// Whether `actor` is the author of the node or an admin.
    pub async fn can_modify(&self, actor: &User, id: NodeId) -> Result<bool> {
        let node = self.nodes.get_node(id).await?;
        Ok(actor.is_admin || node.author_id == actor.id)
    }

    pub async fn categories(&self) -> Result<Vec<Classifier>> {
        self.catalog.categories().await
    }

    pub async fn tags(&self) -> Result<Vec<Classifier>> {
        self.catalog.tags().await
    }

    // ── Interactions ────────────────────────────────────────────────────────

    pub async fn interact(&self, user: &User, id: NodeId, kind: InteractionKind) -> Result<()> {
        self.nodes.get_node(id).await?;
        self.interactions.set_interaction(id, user.id, kind).await
    }

    pub async fn remove_interaction(&self, user: &User, id: NodeId, kind: InteractionKind) -> Result<()> {
        self.nodes.get_node(id).await?;
        self.interactions.remove_interaction(id, user.id, kind).await
    }

    pub async fn interaction_state(&self, user: &User, id: NodeId) -> Result<InteractionState> {
        self.interactions.interaction_state(id, user.id).await
    }

    pub async fn aggregates(&self, id: NodeId) -> Result<Aggregates> {
        self.nodes.get_node(id).await?;
        aggregates_for(self.aggregates.as_ref(), id).await
    }

    pub async fn save_thread(&self, user: &User, id: NodeId) -> Result<()> {
        let node = self.nodes.get_node(id).await?;
        if !node.is_root() {
            return Err(AppError::invalid("Only threads can be saved"));
        }
        self.interactions.save_thread(id, user.id).await
    }

    pub async fn unsave_thread(&self, user: &User, id: NodeId) -> Result<()> {
        self.interactions.unsave_thread(id, user.id).await
    }

    pub async fn is_saved(&self, user: &User, id: NodeId) -> Result<bool> {
        self.interactions.is_saved(id, user.id).await
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    async fn require_user(&self, username: &str) -> Result<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User", username))
    }

    async fn totals_for(&self, username: &str) -> Result<ActivityTotals> {
        let user = self.require_user(username).await?;
        self.users
            .activity_totals(Some(user.id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("User", username))
    }

    async fn require_modifiable(&self, actor: &User, id: NodeId) -> Result<Node> {
        let node = self.nodes.get_node(id).await?;
        if actor.is_admin || node.author_id == actor.id {
            Ok(node)
        } else {
            warn!(node_id = %id, actor = %actor.username, "modification forbidden");
            Err(AppError::Forbidden(
                "You are not authorized to modify this thread".into(),
            ))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;
    use crate::traits::{
        MockAggregateCalculator, MockAuthProvider, MockInteractionStore, MockNodeStore,
        MockThreadCatalog, MockUserStore,
    };
    use chrono::Utc;
    use mockall::predicate::eq;

    fn user(id: i64, is_admin: bool) -> User {
        User {
            id: UserId(id),
            username: format!("user{id}"),
            password_hash: "hash".into(),
            is_admin,
            bio: String::new(),
            created_at: Utc::now(),
        }
    }

    fn node(id: i64, author: i64, kind: NodeKind) -> Node {
        Node {
            id: NodeId(id),
            kind,
            content: "Please follow the rules".into(),
            author_id: UserId(author),
            author_name: format!("user{author}"),
            created_at: Utc::now(),
        }
    }

    fn root_kind() -> NodeKind {
        NodeKind::Root {
            title: "Welcome to the forum".into(),
            category: None,
            tag: None,
        }
    }

    struct Mocks {
        nodes: MockNodeStore,
        aggregates: MockAggregateCalculator,
        interactions: MockInteractionStore,
        catalog: MockThreadCatalog,
        users: MockUserStore,
        auth: MockAuthProvider,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                nodes: MockNodeStore::new(),
                aggregates: MockAggregateCalculator::new(),
                interactions: MockInteractionStore::new(),
                catalog: MockThreadCatalog::new(),
                users: MockUserStore::new(),
                auth: MockAuthProvider::new(),
            }
        }

        fn service(self) -> ForumService {
            ForumService::new(
                Ports {
                    nodes: Arc::new(self.nodes),
                    aggregates: Arc::new(self.aggregates),
                    interactions: Arc::new(self.interactions),
                    catalog: Arc::new(self.catalog),
                    users: Arc::new(self.users),
                    auth: Arc::new(self.auth),
                },
                ContentPolicy::default(),
            )
        }
    }

    #[tokio::test]
    async fn create_thread_reports_all_errors_and_persists_nothing() {
        let mut m = Mocks::new();
        m.nodes.expect_title_exists().returning(|_| Ok(true));
        m.nodes.expect_create_node().never();

        let err = m
            .service()
            .create_thread(
                &user(1, false),
                NewThread {
                    title: Some("Welcome to the forum".into()),
                    content: Some("short".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => assert_eq!(
                errors,
                vec![
                    "Title must be unique".to_string(),
                    "Content must be at least 10 characters long".to_string(),
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_thread_persists_root() {
        let mut m = Mocks::new();
        m.nodes.expect_title_exists().returning(|_| Ok(false));
        m.nodes
            .expect_create_node()
            .withf(|n| {
                n.author_id == UserId(1)
                    && matches!(&n.kind, NodeKind::Root { title, category: Some(c), tag: None }
                        if title == "Welcome to the forum" && c == "general")
            })
            .returning(|_| Ok(NodeId(10)));

        let id = m
            .service()
            .create_thread(
                &user(1, true),
                NewThread {
                    title: Some("Welcome to the forum".into()),
                    content: Some("Please follow the rules".into()),
                    category: Some(" general ".into()),
                    tag: Some("  ".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(id, NodeId(10));
    }

    #[tokio::test]
    async fn reply_gets_depth_from_parent() {
        let mut m = Mocks::new();
        m.nodes.expect_get_depth().with(eq(NodeId(1))).returning(|_| Ok(0));
        m.nodes
            .expect_create_node()
            .withf(|n| n.kind == NodeKind::Reply { parent_id: NodeId(1), depth: 1 })
            .returning(|_| Ok(NodeId(2)));

        let id = m
            .service()
            .reply(&user(2, false), NodeId(1), "I agree with this")
            .await
            .unwrap();
        assert_eq!(id, NodeId(2));
    }

    #[tokio::test]
    async fn reply_beyond_ceiling_is_not_persisted() {
        let mut m = Mocks::new();
        m.nodes.expect_get_depth().returning(|_| Ok(3));
        m.nodes.expect_create_node().never();

        let err = m
            .service()
            .reply(&user(2, false), NodeId(4), "I agree with this")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DepthExceeded { .. }));
    }

    #[tokio::test]
    async fn strangers_cannot_delete() {
        let mut m = Mocks::new();
        m.nodes
            .expect_get_node()
            .returning(|id| Ok(node(id.0, 1, root_kind())));
        m.nodes.expect_delete_node().never();

        let err = m
            .service()
            .delete_node(&user(2, false), NodeId(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admins_can_delete_any_node() {
        let mut m = Mocks::new();
        m.nodes
            .expect_get_node()
            .returning(|id| Ok(node(id.0, 1, root_kind())));
        m.nodes
            .expect_delete_node()
            .with(eq(NodeId(1)))
            .times(1)
            .returning(|_| Ok(()));

        m.service().delete_node(&user(9, true), NodeId(1)).await.unwrap();
    }

    #[tokio::test]
    async fn comments_cannot_gain_a_title() {
        let mut m = Mocks::new();
        m.nodes.expect_get_node().returning(|id| {
            Ok(node(
                id.0,
                2,
                NodeKind::Reply {
                    parent_id: NodeId(1),
                    depth: 1,
                },
            ))
        });
        m.nodes.expect_update_node().never();

        let err = m
            .service()
            .update_node(
                &user(2, false),
                NodeId(5),
                NodePatch {
                    title: Some("A brand new title".into()),
                    content: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(e) if e == vec!["Comments cannot have a title".to_string()]));
    }

    #[tokio::test]
    async fn register_batches_rule_violations() {
        let mut m = Mocks::new();
        m.users.expect_create_user().never();

        let err = m.service().register("a!", "short").await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let mut m = Mocks::new();
        m.users
            .expect_find_by_username()
            .returning(|_| Ok(Some(user(1, false))));
        m.auth.expect_verify_password().returning(|_, _| false);
        m.auth.expect_issue_token().never();

        let err = m.service().login("user1", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn only_roots_can_be_saved() {
        let mut m = Mocks::new();
        m.nodes.expect_get_node().returning(|id| {
            Ok(node(
                id.0,
                1,
                NodeKind::Reply {
                    parent_id: NodeId(1),
                    depth: 1,
                },
            ))
        });
        m.interactions.expect_save_thread().never();

        let err = m.service().save_thread(&user(1, false), NodeId(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn ensure_admin_registers_missing_account_once() {
        let mut m = Mocks::new();
        // Once in ensure_admin, once in register's duplicate check.
        m.users
            .expect_find_by_username()
            .times(2)
            .returning(|_| Ok(None));
        m.auth.expect_hash_password().returning(|_| Ok("phc".into()));
        m.users
            .expect_create_user()
            .withf(|name, hash| name == "root" && hash == "phc")
            .returning(|_, _| Ok(UserId(1)));
        m.users
            .expect_set_admin()
            .with(eq(UserId(1)), eq(true))
            .times(1)
            .returning(|_, _| Ok(()));

        let id = m.service().ensure_admin("root", "changeme123").await.unwrap();
        assert_eq!(id, UserId(1));
    }

    #[tokio::test]
    async fn ensure_admin_leaves_existing_admin_alone() {
        let mut m = Mocks::new();
        m.users
            .expect_find_by_username()
            .returning(|_| Ok(Some(user(1, true))));
        m.users.expect_set_admin().never();
        m.users.expect_create_user().never();

        assert_eq!(
            m.service().ensure_admin("user1", "changeme123").await.unwrap(),
            UserId(1)
        );
    }
}
