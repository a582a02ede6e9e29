//! # Write Guard
//!
//! Every create and update passes through here before reaching the
//! [`NodeStore`]. Validators collect all violations into a list instead of
//! stopping at the first one, so a client sees every broken rule at once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::NodeId;
use crate::traits::NodeStore;

/// Inclusive character-count bounds for a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Tunable limits for node writes. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    /// Deepest allowed reply. Roots are depth 0.
    pub max_depth: u32,
    pub thread_content: LengthBounds,
    pub reply_content: LengthBounds,
    pub title: LengthBounds,
    /// Matched case-insensitively as substrings.
    pub prohibited_words: Vec<String>,
}

impl ContentPolicy {
    /// Trims denylist entries and drops blank ones. A blank entry would
    /// match every string.
    pub fn without_blank_words(mut self) -> Self {
        self.prohibited_words = self
            .prohibited_words
            .into_iter()
            .map(|word| word.trim().to_string())
            .filter(|word| !word.is_empty())
            .collect();
        self
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            max_depth: 3,
            thread_content: LengthBounds::new(10, 1000),
            reply_content: LengthBounds::new(5, 500),
            title: LengthBounds::new(5, 100),
            prohibited_words: vec!["bitcoin".into(), "tesla".into()],
        }
    }
}

pub struct WriteGuard {
    nodes: Arc<dyn NodeStore>,
    policy: ContentPolicy,
}

impl WriteGuard {
    pub fn new(nodes: Arc<dyn NodeStore>, policy: ContentPolicy) -> Self {
        Self {
            nodes,
            policy: policy.without_blank_words(),
        }
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    /// Returns the depth a reply to `parent_id` would have.
    ///
    /// Fails with `DepthExceeded` rather than clamping when the parent is
    /// already at the ceiling.
    pub async fn prepare_reply(&self, parent_id: NodeId) -> Result<u32> {
        let parent_depth = self.nodes.get_depth(parent_id).await?;
        let depth = parent_depth + 1;
        if depth > self.policy.max_depth {
            warn!(%parent_id, depth, ceiling = self.policy.max_depth, "reply rejected: too deep");
            return Err(AppError::DepthExceeded {
                depth,
                ceiling: self.policy.max_depth,
            });
        }
        Ok(depth)
    }

    pub fn validate_content(&self, content: &str, bounds: LengthBounds) -> Vec<String> {
        self.check_text("Content", content, bounds)
    }

    /// Validates a root title. `None` is only acceptable on edit, where it
    /// means "leave unchanged". Uniqueness is checked only for new roots.
    pub async fn validate_title(&self, title: Option<&str>, is_edit: bool) -> Result<Vec<String>> {
        let Some(title) = title else {
            return Ok(if is_edit {
                Vec::new()
            } else {
                vec!["Title is required".to_string()]
            });
        };

        let mut errors = self.check_text("Title", title, self.policy.title);
        if !is_edit && !title.trim().is_empty() && self.nodes.title_exists(title).await? {
            errors.push("Title must be unique".to_string());
        }
        Ok(errors)
    }

    fn check_text(&self, field: &str, text: &str, bounds: LengthBounds) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![format!("{field} is required")];
        }

        let mut errors = Vec::new();
        let lowered = text.to_lowercase();
        for word in &self.policy.prohibited_words {
            if lowered.contains(&word.to_lowercase()) {
                errors.push(format!("{field} contains prohibited word: {word}"));
            }
        }

        let len = text.chars().count();
        if len < bounds.min {
            errors.push(format!("{field} must be at least {} characters long", bounds.min));
        }
        if len > bounds.max {
            errors.push(format!("{field} must be no more than {} characters long", bounds.max));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockNodeStore;
    use mockall::predicate::eq;

    fn guard_with(store: MockNodeStore) -> WriteGuard {
        WriteGuard::new(Arc::new(store), ContentPolicy::default())
    }

    #[tokio::test]
    async fn reply_below_ceiling_gets_parent_depth_plus_one() {
        let mut store = MockNodeStore::new();
        store.expect_get_depth().with(eq(NodeId(1))).returning(|_| Ok(2));
        let guard = guard_with(store);

        assert_eq!(guard.prepare_reply(NodeId(1)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reply_to_node_at_ceiling_is_rejected() {
        let mut store = MockNodeStore::new();
        store.expect_get_depth().returning(|_| Ok(3));
        let guard = guard_with(store);

        let err = guard.prepare_reply(NodeId(9)).await.unwrap_err();
        assert!(matches!(err, AppError::DepthExceeded { depth: 4, ceiling: 3 }));
    }

    #[tokio::test]
    async fn reply_to_missing_parent_is_not_found() {
        let mut store = MockNodeStore::new();
        store
            .expect_get_depth()
            .returning(|id| Err(AppError::not_found("Node", id)));
        let guard = guard_with(store);

        assert!(matches!(
            guard.prepare_reply(NodeId(5)).await,
            Err(AppError::NotFound(..))
        ));
    }

    #[test]
    fn content_reports_every_violation() {
        let guard = guard_with(MockNodeStore::new());
        let errors = guard.validate_content("Tesla!", LengthBounds::new(10, 1000));
        assert_eq!(
            errors,
            vec![
                "Content contains prohibited word: tesla".to_string(),
                "Content must be at least 10 characters long".to_string(),
            ]
        );
    }

    #[test]
    fn prohibited_words_match_inside_other_words() {
        let guard = guard_with(MockNodeStore::new());
        let errors = guard.validate_content("I mined some BitcoinCash today", LengthBounds::new(5, 500));
        assert_eq!(errors, vec!["Content contains prohibited word: bitcoin".to_string()]);
    }

    #[test]
    fn blank_denylist_entries_are_ignored() {
        let policy = ContentPolicy {
            prohibited_words: vec!["".into(), "  ".into(), " spam ".into()],
            ..ContentPolicy::default()
        };
        let guard = WriteGuard::new(Arc::new(MockNodeStore::new()), policy);
        assert_eq!(guard.policy().prohibited_words, vec!["spam".to_string()]);

        let bounds = LengthBounds::new(5, 500);
        assert!(guard.validate_content("A perfectly ordinary comment", bounds).is_empty());
        assert_eq!(
            guard.validate_content("Cheap SPAM here", bounds),
            vec!["Content contains prohibited word: spam".to_string()]
        );
    }

    #[test]
    fn blank_content_is_required() {
        let guard = guard_with(MockNodeStore::new());
        assert_eq!(
            guard.validate_content("   ", LengthBounds::new(5, 500)),
            vec!["Content is required".to_string()]
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let guard = guard_with(MockNodeStore::new());
        assert!(guard.validate_content("ééééé", LengthBounds::new(5, 5)).is_empty());
    }

    #[tokio::test]
    async fn new_title_must_be_unique() {
        let mut store = MockNodeStore::new();
        store
            .expect_title_exists()
            .withf(|title| title == "Welcome to the forum")
            .returning(|_| Ok(true));
        let guard = guard_with(store);

        let errors = guard
            .validate_title(Some("Welcome to the forum"), false)
            .await
            .unwrap();
        assert_eq!(errors, vec!["Title must be unique".to_string()]);
    }

    #[tokio::test]
    async fn edited_title_skips_uniqueness() {
        let mut store = MockNodeStore::new();
        store.expect_title_exists().never();
        let guard = guard_with(store);

        assert!(guard
            .validate_title(Some("Welcome to the forum"), true)
            .await
            .unwrap()
            .is_empty());
        assert!(guard.validate_title(None, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_title_on_create() {
        let guard = guard_with(MockNodeStore::new());
        assert_eq!(
            guard.validate_title(None, false).await.unwrap(),
            vec!["Title is required".to_string()]
        );
    }
}
