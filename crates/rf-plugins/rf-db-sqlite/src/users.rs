use async_trait::async_trait;
use rf_core::error::{AppError, Result};
use rf_core::models::{ActivityTotals, User, UserId};
use rf_core::traits::UserStore;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::{now, storage, SqliteForumRepo};

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: UserId(row.try_get("id").map_err(storage)?),
        username: row.try_get("username").map_err(storage)?,
        password_hash: row.try_get("password_hash").map_err(storage)?,
        is_admin: row.try_get("is_admin").map_err(storage)?,
        bio: row.try_get("bio").map_err(storage)?,
        created_at: row.try_get("created_at").map_err(storage)?,
    })
}

fn totals_from_row(row: &SqliteRow) -> Result<ActivityTotals> {
    Ok(ActivityTotals {
        user_id: UserId(row.try_get("id").map_err(storage)?),
        username: row.try_get("username").map_err(storage)?,
        threads: row.try_get("threads").map_err(storage)?,
        comments: row.try_get("comments").map_err(storage)?,
        thread_likes: row.try_get("thread_likes").map_err(storage)?,
        comment_likes: row.try_get("comment_likes").map_err(storage)?,
        dislikes_received: row.try_get("dislikes_received").map_err(storage)?,
    })
}

fn require_affected(affected: u64, user: UserId) -> Result<()> {
    if affected == 0 {
        return Err(AppError::not_found("User", user));
    }
    Ok(())
}

#[async_trait]
impl UserStore for SqliteForumRepo {
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId> {
        let result = sqlx::query("INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(now())
            .execute(&self.pool)
            .await
            .map_err(|e| match storage(e) {
                AppError::Conflict(_) => AppError::Conflict("Username already exists".into()),
                other => other,
            })?;
        Ok(UserId(result.last_insert_rowid()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, is_admin, bio, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_password(&self, user: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        require_affected(result.rows_affected(), user)
    }

    async fn update_bio(&self, user: UserId, bio: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
            .bind(bio)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        require_affected(result.rows_affected(), user)
    }

    async fn set_admin(&self, user: UserId, is_admin: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(user.0)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        require_affected(result.rows_affected(), user)
    }

    async fn activity_totals(&self, user: Option<UserId>) -> Result<Vec<ActivityTotals>> {
        let user = user.map(|u| u.0);
        let rows = sqlx::query(
            "SELECT u.id, u.username, \
               (SELECT COUNT(*) FROM nodes n WHERE n.author_id = u.id AND n.parent_id IS NULL) AS threads, \
               (SELECT COUNT(*) FROM nodes n WHERE n.author_id = u.id AND n.parent_id IS NOT NULL) AS comments, \
               (SELECT COUNT(*) FROM interactions i JOIN nodes n ON n.id = i.node_id \
                  WHERE n.author_id = u.id AND n.parent_id IS NULL AND i.kind = 'like') AS thread_likes, \
               (SELECT COUNT(*) FROM interactions i JOIN nodes n ON n.id = i.node_id \
                  WHERE n.author_id = u.id AND n.parent_id IS NOT NULL AND i.kind = 'like') AS comment_likes, \
               (SELECT COUNT(*) FROM interactions i JOIN nodes n ON n.id = i.node_id \
                  WHERE n.author_id = u.id AND i.kind = 'dislike') AS dislikes_received \
             FROM users u \
             WHERE (? IS NULL OR u.id = ?) \
             ORDER BY u.id",
        )
        .bind(user)
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.iter().map(totals_from_row).collect()
    }
}
