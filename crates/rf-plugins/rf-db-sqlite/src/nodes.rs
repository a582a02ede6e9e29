//! Node persistence and live aggregates.

use async_trait::async_trait;
use rf_core::error::{AppError, Result};
use rf_core::models::{NewNode, Node, NodeId, NodeKind, NodePatch};
use rf_core::traits::{AggregateCalculator, NodeStore};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::{node_from_row, now, storage, SqliteForumRepo, NODE_COLUMNS, NODE_JOINS};

/// Classifier tables a root node can reference.
#[derive(Clone, Copy)]
enum Classifier {
    Category,
    Tag,
}

impl Classifier {
    fn table(self) -> &'static str {
        match self {
            Classifier::Category => "categories",
            Classifier::Tag => "tags",
        }
    }
}

/// Returns the id for `name`, inserting it first if it is new.
async fn resolve_classifier(
    tx: &mut Transaction<'_, Sqlite>,
    classifier: Classifier,
    name: Option<&str>,
) -> Result<Option<i64>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let table = classifier.table();
    sqlx::query(&format!("INSERT INTO {table} (name) VALUES (?) ON CONFLICT(name) DO NOTHING"))
        .bind(name)
        .execute(&mut **tx)
        .await
        .map_err(storage)?;
    let id: i64 = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE name = ?"))
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .map_err(storage)?;
    Ok(Some(id))
}

#[async_trait]
impl NodeStore for SqliteForumRepo {
    /// Inserts a root (resolving its classifiers in the same transaction) or a reply.
    ///
    /// # Developer Note
    /// The partial unique index on root titles is what actually guarantees
    /// uniqueness; the write guard's pre-check only produces a friendlier
    /// message in the common case.
    async fn create_node(&self, node: NewNode) -> Result<NodeId> {
        let created_at = now();
        let id = match &node.kind {
            NodeKind::Root { title, category, tag } => {
                let mut tx = self.pool.begin().await.map_err(storage)?;
                let category_id = resolve_classifier(&mut tx, Classifier::Category, category.as_deref()).await?;
                let tag_id = resolve_classifier(&mut tx, Classifier::Tag, tag.as_deref()).await?;

                let result = sqlx::query(
                    "INSERT INTO nodes (parent_id, title, content, author_id, depth, category_id, tag_id, created_at) \
                     VALUES (NULL, ?, ?, ?, 0, ?, ?, ?)",
                )
                .bind(title)
                .bind(&node.content)
                .bind(node.author_id.0)
                .bind(category_id)
                .bind(tag_id)
                .bind(created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| match storage(e) {
                    AppError::Conflict(_) => AppError::Conflict("Title must be unique".into()),
                    other => other,
                })?;

                tx.commit().await.map_err(storage)?;
                result.last_insert_rowid()
            }
            NodeKind::Reply { parent_id, depth } => sqlx::query(
                "INSERT INTO nodes (parent_id, title, content, author_id, depth, created_at) \
                 VALUES (?, NULL, ?, ?, ?, ?)",
            )
            .bind(parent_id.0)
            .bind(&node.content)
            .bind(node.author_id.0)
            .bind(i64::from(*depth))
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .last_insert_rowid(),
        };

        debug!(node_id = id, "node inserted");
        Ok(NodeId(id))
    }

    async fn get_node(&self, id: NodeId) -> Result<Node> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM nodes n {NODE_JOINS} WHERE n.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| AppError::not_found("Node", id))?;
        node_from_row(&row)
    }

    async fn get_depth(&self, id: NodeId) -> Result<u32> {
        let depth: i64 = sqlx::query_scalar("SELECT depth FROM nodes WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| AppError::not_found("Node", id))?;
        u32::try_from(depth).map_err(|_| AppError::Storage(format!("invalid depth {depth}")))
    }

    async fn update_node(&self, id: NodeId, patch: NodePatch) -> Result<()> {
        let result = sqlx::query(
            "UPDATE nodes SET title = COALESCE(?, title), content = COALESCE(?, content) WHERE id = ?",
        )
        .bind(patch.title)
        .bind(patch.content)
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| match storage(e) {
            AppError::Conflict(_) => AppError::Conflict("Title must be unique".into()),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Node", id));
        }
        Ok(())
    }

    /// Descendants, interactions, and saves go with the node via `ON DELETE CASCADE`.
    async fn delete_node(&self, id: NodeId) -> Result<()> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Node", id));
        }
        Ok(())
    }

    async fn descendants(&self, root_id: NodeId) -> Result<Vec<Node>> {
        let sql = format!(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM nodes WHERE parent_id = ? \
                 UNION ALL \
                 SELECT child.id FROM nodes child JOIN subtree s ON child.parent_id = s.id \
             ) \
             SELECT {NODE_COLUMNS} FROM subtree s JOIN nodes n ON n.id = s.id {NODE_JOINS}"
        );
        let rows = sqlx::query(&sql)
            .bind(root_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(node_from_row).collect()
    }

    async fn title_exists(&self, title: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM nodes WHERE parent_id IS NULL AND title = ?)")
            .bind(title)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}

#[async_trait]
impl AggregateCalculator for SqliteForumRepo {
    async fn like_count(&self, id: NodeId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE node_id = ? AND kind = 'like'")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }

    async fn dislike_count(&self, id: NodeId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE node_id = ? AND kind = 'dislike'")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }

    async fn reply_count(&self, id: NodeId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE parent_id = ?")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}
