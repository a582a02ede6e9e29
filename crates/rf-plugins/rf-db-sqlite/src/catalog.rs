//! Thread listing and classifier lookups.

use async_trait::async_trait;
use rf_core::error::{AppError, Result};
use rf_core::models::{AnnotatedNode, Classifier, ThreadQuery, ThreadSort, UserId};
use rf_core::traits::ThreadCatalog;
use sqlx::Row;

use crate::{
    annotated_from_row, like_pattern, storage, SqliteForumRepo, AGGREGATE_COLUMNS, NODE_COLUMNS, NODE_JOINS,
};

/// Predicate shared by the list and count queries. Binds: pattern twice,
/// category twice, tag twice.
const THREAD_FILTER: &str = "n.parent_id IS NULL \
     AND (n.title LIKE ? ESCAPE '\\' OR n.content LIKE ? ESCAPE '\\') \
     AND (? IS NULL OR c.name = ?) \
     AND (? IS NULL OR t.name = ?)";

fn order_column(sort: ThreadSort) -> &'static str {
    match sort {
        ThreadSort::CreatedAt => "n.created_at",
        ThreadSort::Likes => "likes",
        ThreadSort::Dislikes => "dislikes",
        ThreadSort::Comments => "replies",
    }
}

impl SqliteForumRepo {
    async fn classifiers(&self, table: &str) -> Result<Vec<Classifier>> {
        let rows = sqlx::query(&format!("SELECT id, name FROM {table} ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter()
            .map(|row| {
                Ok(Classifier {
                    id: row.try_get("id").map_err(storage)?,
                    name: row.try_get("name").map_err(storage)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ThreadCatalog for SqliteForumRepo {
    async fn list_threads(&self, query: &ThreadQuery) -> Result<Vec<AnnotatedNode>> {
        let sql = format!(
            "SELECT {NODE_COLUMNS}, {AGGREGATE_COLUMNS} FROM nodes n {NODE_JOINS} \
             WHERE {THREAD_FILTER} \
             ORDER BY {} DESC, n.id DESC \
             LIMIT ? OFFSET ?",
            order_column(query.sort)
        );
        let pattern = like_pattern(&query.search);
        let limit = i64::from(query.page.limit);
        let offset = i64::try_from(query.page.offset()).map_err(|e| AppError::Internal(e.to_string()))?;

        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&query.category)
            .bind(&query.category)
            .bind(&query.tag)
            .bind(&query.tag)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(annotated_from_row).collect()
    }

    async fn count_threads(&self, query: &ThreadQuery) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM nodes n {NODE_JOINS} WHERE {THREAD_FILTER}");
        let pattern = like_pattern(&query.search);
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&query.category)
            .bind(&query.category)
            .bind(&query.tag)
            .bind(&query.tag)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(total.max(0) as u64)
    }

    async fn nodes_by_author(&self, author: UserId) -> Result<Vec<AnnotatedNode>> {
        let sql = format!(
            "SELECT {NODE_COLUMNS}, {AGGREGATE_COLUMNS} FROM nodes n {NODE_JOINS} \
             WHERE n.author_id = ? ORDER BY n.created_at DESC, n.id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(author.0)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(annotated_from_row).collect()
    }

    async fn categories(&self) -> Result<Vec<Classifier>> {
        self.classifiers("categories").await
    }

    async fn tags(&self) -> Result<Vec<Classifier>> {
        self.classifiers("tags").await
    }
}
