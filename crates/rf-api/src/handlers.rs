//! # rf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the
//! [`ForumService`](rf_core::ForumService). Handlers only decode input,
//! call one service operation, and encode its result.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rf_core::models::{
    Aggregates, AnnotatedNode, Classifier, InteractionKind, InteractionState, NodeId, NodePatch, SavedThread,
    SortKey, ThreadQuery, ThreadSort, ThreadView, UserActivity, UserInfo, UserMetrics, UserScores,
};
use rf_core::pagination::{Page, PageRequest};
use rf_core::service::NewThread;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

// ── Accounts ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct BioUpdate {
    pub bio: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.service.register(&body.username, &body.password).await?;
    Ok((StatusCode::CREATED, Json(json!({ "user_id": id }))))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<Credentials>) -> ApiResult<Json<Value>> {
    let token = state.service.login(&body.username, &body.password).await?;
    Ok(Json(json!({ "token": token })))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<PasswordChange>,
) -> ApiResult<StatusCode> {
    state
        .service
        .change_password(&user, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_bio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<BioUpdate>,
) -> ApiResult<StatusCode> {
    state.service.update_bio(&user, &body.bio).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_info(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Json<UserInfo>> {
    Ok(Json(state.service.user_info(&username).await?))
}

pub async fn user_metrics(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserMetrics>> {
    Ok(Json(state.service.user_metrics(&username).await?))
}

pub async fn user_scores(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserScores>> {
    Ok(Json(state.service.user_scores(&username).await?))
}

pub async fn user_activity(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<UserActivity>> {
    Ok(Json(state.service.user_activity(&username).await?))
}

pub async fn saved_threads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<SavedThread>>> {
    Ok(Json(state.service.saved_threads(&user).await?))
}

pub async fn promote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.set_admin(&actor, &username, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn demote(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.set_admin(&actor, &username, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leaderboard(State(state): State<AppState>) -> ApiResult<Json<Vec<UserScores>>> {
    Ok(Json(state.service.leaderboard().await?))
}

// ── Threads and comments ────────────────────────────────────────────────────

/// `GET /threads?search=&sort=&category=&tag=&page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct ThreadListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<ThreadListParams> for ThreadQuery {
    fn from(params: ThreadListParams) -> Self {
        ThreadQuery {
            search: params.search.unwrap_or_default(),
            sort: params
                .sort
                .as_deref()
                .map(ThreadSort::parse_or_default)
                .unwrap_or_default(),
            category: params.category.filter(|c| !c.is_empty()),
            tag: params.tag.filter(|t| !t.is_empty()),
            page: PageRequest::new(params.page, params.limit),
        }
    }
}

/// `GET /threads/{id}?search=&sort=`
#[derive(Debug, Default, Deserialize)]
pub struct ThreadViewParams {
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    pub content: String,
}

pub async fn list_threads(
    State(state): State<AppState>,
    Query(params): Query<ThreadListParams>,
) -> ApiResult<Json<Page<AnnotatedNode>>> {
    let query = ThreadQuery::from(params);
    Ok(Json(state.service.list_threads(&query).await?))
}

pub async fn thread_view(
    State(state): State<AppState>,
    Path(id): Path<NodeId>,
    Query(params): Query<ThreadViewParams>,
) -> ApiResult<Json<ThreadView>> {
    let sort = params
        .sort
        .as_deref()
        .map(SortKey::parse_or_default)
        .unwrap_or_default();
    let search = params.search.unwrap_or_default();
    Ok(Json(state.service.thread_view(id, &search, sort).await?))
}

pub async fn create_thread(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewThread>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.service.create_thread(&user, body).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn reply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(parent): Path<NodeId>,
    Json(body): Json<CommentBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = state.service.reply(&user, parent, &body.content).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_node(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
    Json(patch): Json<NodePatch>,
) -> ApiResult<StatusCode> {
    state.service.update_node(&user, id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_node(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.delete_node(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn authorization(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<Json<Value>> {
    let authorized = state.service.can_modify(&user, id).await?;
    Ok(Json(json!({ "authorized": authorized })))
}

pub async fn aggregates(State(state): State<AppState>, Path(id): Path<NodeId>) -> ApiResult<Json<Aggregates>> {
    Ok(Json(state.service.aggregates(id).await?))
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Classifier>>> {
    Ok(Json(state.service.categories().await?))
}

pub async fn tags(State(state): State<AppState>) -> ApiResult<Json<Vec<Classifier>>> {
    Ok(Json(state.service.tags().await?))
}

// ── Interactions ────────────────────────────────────────────────────────────

pub async fn like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.interact(&user, id, InteractionKind::Like).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.remove_interaction(&user, id, InteractionKind::Like).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn dislike(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.interact(&user, id, InteractionKind::Dislike).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn undislike(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state
        .service
        .remove_interaction(&user, id, InteractionKind::Dislike)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn interaction_state(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<Json<InteractionState>> {
    Ok(Json(state.service.interaction_state(&user, id).await?))
}

pub async fn save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.save_thread(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unsave(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<StatusCode> {
    state.service.unsave_thread(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn is_saved(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NodeId>,
) -> ApiResult<Json<Value>> {
    let saved = state.service.is_saved(&user, id).await?;
    Ok(Json(json!({ "saved": saved })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_normalize_into_query() {
        let query = ThreadQuery::from(ThreadListParams {
            search: Some("rust".into()),
            sort: Some("comments".into()),
            category: Some(String::new()),
            tag: Some("intro".into()),
            page: Some(0),
            limit: None,
        });
        assert_eq!(query.search, "rust");
        assert_eq!(query.sort, ThreadSort::Comments);
        assert_eq!(query.category, None);
        assert_eq!(query.tag.as_deref(), Some("intro"));
        assert_eq!(query.page, PageRequest::default());
    }

    #[test]
    fn unknown_sort_falls_back_to_creation_time() {
        let query = ThreadQuery::from(ThreadListParams {
            sort: Some("popularity".into()),
            ..Default::default()
        });
        assert_eq!(query.sort, ThreadSort::CreatedAt);
    }
}
