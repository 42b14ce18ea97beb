//! User handlers.
//!
//! Stand-ins for the bot's inbound events. Every repository call runs inside
//! the request's `CallScope`, so a shutdown cancels it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use coderoot_core::storage::{Pagination, RepositoryError};
use coderoot_core::user::{
    validate_new_user, validate_update, ActiveUsersPage, ListActiveUsersQuery, StartRequest,
    StartResponse, User, UserId, UserStats, UserUpdate,
};

use crate::{handlers::AppError, state::AppState};

fn user_not_found(id: impl ToString) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "User",
        id: id.to_string(),
    }
}

/// First interaction from a user (POST /api/users/start).
///
/// Creates unseen users, resolving an optional `ref_<code>` payload to the
/// referring user. Known users only get their activity touched.
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, AppError> {
    let repo = &state.user_repo;

    if let Some(user) = state.scoped(repo.get_by_user_id(request.user_id)).await? {
        state
            .scoped(repo.update_last_activity(user.user_id))
            .await?;
        return Ok(Json(StartResponse {
            user,
            created: false,
        }));
    }

    let mut user = request.to_user(&state.config.default_language);
    validate_new_user(&user)?;

    if let Some(code) = request.referral_code() {
        match state.scoped(repo.get_by_referral_code(code)).await {
            Ok(Some(referrer)) if referrer.user_id != user.user_id => {
                user.referred_by = Some(referrer.user_id);
            }
            Ok(_) => tracing::debug!(code, "Ignoring unknown referral code"),
            Err(err) => tracing::warn!(code, error = %err, "Referral lookup failed"),
        }
    }

    match state.scoped(repo.create(&mut user)).await {
        Ok(()) => Ok(Json(StartResponse {
            user,
            created: true,
        })),
        // A concurrent start for the same user won the insert.
        Err(err) if err.is_conflict() => {
            let existing = state
                .scoped(repo.get_by_user_id(request.user_id))
                .await?
                .ok_or(err)?;
            Ok(Json(StartResponse {
                user: existing,
                created: false,
            }))
        }
        Err(err) => Err(err.into()),
    }
}

/// List active users (GET /api/users?page=&limit=).
pub async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<ListActiveUsersQuery>,
) -> Result<Json<ActiveUsersPage>, AppError> {
    let pagination = Pagination::new(query.page, query.limit)?;
    let page = state
        .scoped(state.user_repo.get_active_users(pagination))
        .await?;
    Ok(Json(page))
}

/// Aggregate counts (GET /api/users/stats).
pub async fn stats(State(state): State<AppState>) -> Result<Json<UserStats>, AppError> {
    let stats = state.scoped(state.user_repo.get_user_stats()).await?;
    Ok(Json(stats))
}

/// Get a user (GET /api/users/{user_id}).
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    let user = state
        .scoped(state.user_repo.get_by_user_id(user_id))
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    Ok(Json(user))
}

/// Get a user by referral code (GET /api/users/referral/{code}).
pub async fn get_by_referral_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state
        .scoped(state.user_repo.get_by_referral_code(&code))
        .await?
        .ok_or_else(|| user_not_found(&code))?;
    Ok(Json(user))
}

/// Partially update a user (PATCH /api/users/{user_id}).
///
/// Returns the user as stored after the update.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    validate_update(&update)?;

    state
        .scoped(state.user_repo.update(user_id, &update))
        .await?;

    let user = state
        .scoped(state.user_repo.get_by_user_id(user_id))
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    Ok(Json(user))
}

/// Touch a user's activity timestamp (POST /api/users/{user_id}/activity).
pub async fn touch_activity(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    state
        .scoped(state.user_repo.update_last_activity(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete a user (DELETE /api/users/{user_id}).
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    state.scoped(state.user_repo.delete(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
