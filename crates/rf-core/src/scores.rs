//! Contribution scoring and the leaderboard.
//!
//! ```text
//! threads_score      = threads * 5 + avg likes per thread * 10
//! comments_score     = comments * 2 + avg likes per comment * 5
//! contribution_score = threads_score + comments_score - dislikes received * 2
//! ```

use crate::models::{ActivityTotals, UserScores};

const THREAD_WEIGHT: f64 = 5.0;
const THREAD_LIKE_WEIGHT: f64 = 10.0;
const COMMENT_WEIGHT: f64 = 2.0;
const COMMENT_LIKE_WEIGHT: f64 = 5.0;
const DISLIKE_PENALTY: f64 = 2.0;

/// Likes per authored node. Nodes with no likes count toward `count`.
fn average(total: i64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

pub fn score(totals: &ActivityTotals) -> UserScores {
    let threads_score = totals.threads as f64 * THREAD_WEIGHT
        + average(totals.thread_likes, totals.threads) * THREAD_LIKE_WEIGHT;
    let comments_score = totals.comments as f64 * COMMENT_WEIGHT
        + average(totals.comment_likes, totals.comments) * COMMENT_LIKE_WEIGHT;

    UserScores {
        user_id: totals.user_id,
        username: totals.username.clone(),
        threads_score,
        comments_score,
        contribution_score: threads_score + comments_score
            - totals.dislikes_received as f64 * DISLIKE_PENALTY,
    }
}

/// Scores every user, highest contribution first. Ties are ordered by username.
pub fn leaderboard(totals: &[ActivityTotals]) -> Vec<UserScores> {
    let mut board: Vec<UserScores> = totals.iter().map(score).collect();
    board.sort_by(|a, b| {
        b.contribution_score
            .total_cmp(&a.contribution_score)
            .then_with(|| a.username.cmp(&b.username))
    });
    board
}
