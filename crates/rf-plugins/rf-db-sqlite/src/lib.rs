//! # rf-db-sqlite Implementation
//!
//! This crate implements the data mapping between the SQLite relational model
//! and the `rf-core` domain models. One [`SqliteForumRepo`] backs every
//! storage port.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rf_core::error::{AppError, Result};
use rf_core::models::{Aggregates, AnnotatedNode, Node, NodeId, NodeKind, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::info;

mod catalog;
mod interactions;
mod nodes;
mod users;

/// Columns selected for every node read. Pair with [`NODE_JOINS`].
const NODE_COLUMNS: &str = "n.id, n.parent_id, n.title, n.content, n.author_id, \
     u.username AS author_name, n.depth, c.name AS category, t.name AS tag, n.created_at";

const NODE_JOINS: &str = "JOIN users u ON u.id = n.author_id \
     LEFT JOIN categories c ON c.id = n.category_id \
     LEFT JOIN tags t ON t.id = n.tag_id";

/// Live counts selected alongside [`NODE_COLUMNS`] for annotated reads.
const AGGREGATE_COLUMNS: &str =
    "(SELECT COUNT(*) FROM interactions i WHERE i.node_id = n.id AND i.kind = 'like') AS likes, \
     (SELECT COUNT(*) FROM interactions i WHERE i.node_id = n.id AND i.kind = 'dislike') AS dislikes, \
     (SELECT COUNT(*) FROM nodes r WHERE r.parent_id = n.id) AS replies";

pub struct SqliteForumRepo {
    pool: SqlitePool,
}

impl SqliteForumRepo {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    pub async fn new(url: &str) -> Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as its connections, so
        // keep exactly one open for the lifetime of the pool.
        let in_memory = is_in_memory(url);
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_secs(5))
        };

        let pool = pool_options.connect_with(options).await.map_err(storage)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        info!(url, in_memory, "sqlite store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps driver failures onto the core taxonomy. Unique violations become
/// `Conflict`; everything else is an opaque storage error.
pub(crate) fn storage(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(db.message().to_string()),
        _ => AppError::Storage(err.to_string()),
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Wraps a user search term for `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub(crate) fn node_from_row(row: &SqliteRow) -> Result<Node> {
    let parent_id: Option<i64> = row.try_get("parent_id").map_err(storage)?;
    let kind = match parent_id {
        Some(parent_id) => {
            let depth: i64 = row.try_get("depth").map_err(storage)?;
            NodeKind::Reply {
                parent_id: NodeId(parent_id),
                depth: u32::try_from(depth)
                    .map_err(|_| AppError::Storage(format!("invalid depth {depth}")))?,
            }
        }
        None => NodeKind::Root {
            title: row
                .try_get::<Option<String>, _>("title")
                .map_err(storage)?
                .unwrap_or_default(),
            category: row.try_get("category").map_err(storage)?,
            tag: row.try_get("tag").map_err(storage)?,
        },
    };

    Ok(Node {
        id: NodeId(row.try_get("id").map_err(storage)?),
        kind,
        content: row.try_get("content").map_err(storage)?,
        author_id: UserId(row.try_get("author_id").map_err(storage)?),
        author_name: row.try_get("author_name").map_err(storage)?,
        created_at: row.try_get("created_at").map_err(storage)?,
    })
}

/// `sqlite::memory:` and `?mode=memory` both open a database that vanishes
/// with its last connection.
fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub(crate) fn annotated_from_row(row: &SqliteRow) -> Result<AnnotatedNode> {
    Ok(AnnotatedNode {
        node: node_from_row(row)?,
        counts: Aggregates {
            likes: row.try_get("likes").map_err(storage)?,
            dislikes: row.try_get("dislikes").map_err(storage)?,
            replies: row.try_get("replies").map_err(storage)?,
        },
    })
}
