use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::users::{CurrentUser, UserResponse, UserUpdate},
    db::{
        handlers::{Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::Error,
};

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Users::new(&mut conn)
        .get_by_id(user.id)
        .await?
        .ok_or(Error::NotFound {
            resource: "user".to_string(),
            id: user.id.to_string(),
        })?;
    Ok(Json(UserResponse::from(profile)))
}

/// Update the current user's profile
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UserUpdate,
    tag = "users",
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Name already taken"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<UserUpdate>,
) -> Result<Json<UserResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let updated = Users::new(&mut conn)
        .update(
            user.id,
            &UserUpdateDBRequest {
                name: request.name,
                theme: request.theme,
                tos_accepted: request.tos_accepted,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(UserResponse::from(updated)))
}
