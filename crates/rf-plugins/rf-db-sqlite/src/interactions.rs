use async_trait::async_trait;
use rf_core::error::Result;
use rf_core::models::{InteractionKind, InteractionState, NodeId, SavedThread, UserId};
use rf_core::traits::InteractionStore;
use sqlx::Row;

use crate::{now, storage, SqliteForumRepo};

#[async_trait]
impl InteractionStore for SqliteForumRepo {
    /// One row per (node, user): switching between like and dislike is a
    /// single upsert, so the two can never coexist.
    async fn set_interaction(&self, node: NodeId, user: UserId, kind: InteractionKind) -> Result<()> {
        sqlx::query(
            "INSERT INTO interactions (node_id, user_id, kind, created_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(node_id, user_id) DO UPDATE \
             SET kind = excluded.kind, created_at = excluded.created_at \
             WHERE interactions.kind <> excluded.kind",
        )
        .bind(node.0)
        .bind(user.0)
        .bind(kind.as_str())
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn remove_interaction(&self, node: NodeId, user: UserId, kind: InteractionKind) -> Result<()> {
        sqlx::query("DELETE FROM interactions WHERE node_id = ? AND user_id = ? AND kind = ?")
            .bind(node.0)
            .bind(user.0)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn interaction_state(&self, node: NodeId, user: UserId) -> Result<InteractionState> {
        let kind: Option<String> =
            sqlx::query_scalar("SELECT kind FROM interactions WHERE node_id = ? AND user_id = ?")
                .bind(node.0)
                .bind(user.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        Ok(InteractionState {
            liked: kind.as_deref() == Some(InteractionKind::Like.as_str()),
            disliked: kind.as_deref() == Some(InteractionKind::Dislike.as_str()),
        })
    }

    async fn save_thread(&self, node: NodeId, user: UserId) -> Result<()> {
        sqlx::query(
            "INSERT INTO saved_threads (user_id, node_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(user_id, node_id) DO NOTHING",
        )
        .bind(user.0)
        .bind(node.0)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn unsave_thread(&self, node: NodeId, user: UserId) -> Result<()> {
        sqlx::query("DELETE FROM saved_threads WHERE user_id = ? AND node_id = ?")
            .bind(user.0)
            .bind(node.0)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn is_saved(&self, node: NodeId, user: UserId) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM saved_threads WHERE user_id = ? AND node_id = ?)")
            .bind(user.0)
            .bind(node.0)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }

    async fn saved_threads(&self, user: UserId) -> Result<Vec<SavedThread>> {
        let rows = sqlx::query(
            "SELECT n.id, n.title, n.created_at FROM saved_threads s \
             JOIN nodes n ON n.id = s.node_id \
             WHERE s.user_id = ? \
             ORDER BY s.created_at DESC, n.id DESC",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.iter()
            .map(|row| {
                Ok(SavedThread {
                    id: NodeId(row.try_get("id").map_err(storage)?),
                    title: row
                        .try_get::<Option<String>, _>("title")
                        .map_err(storage)?
                        .unwrap_or_default(),
                    created_at: row.try_get("created_at").map_err(storage)?,
                })
            })
            .collect()
    }
}
