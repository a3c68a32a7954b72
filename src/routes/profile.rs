use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::profile::{RegisterProfileRequest, UpdateProfileRequest},
    error::AppResult,
    middleware::auth::{AuthUser, TokenSubject},
    models::Profile,
    response::ApiResponse,
    services::profile_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_me).patch(update_me))
        .route("/register", post(register))
}

#[utoipa::path(
    post,
    path = "/api/profile/register",
    request_body = RegisterProfileRequest,
    responses(
        (status = 200, description = "Profile of the token subject", body = ApiResponse<Profile>),
        (status = 400, description = "Invalid name or email"),
        (status = 409, description = "Email already used by another profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn register(
    State(state): State<AppState>,
    subject: TokenSubject,
    Json(payload): Json<RegisterProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = profile_service::register(&state, subject, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Caller's profile", body = ApiResponse<Profile>),
        (status = 401, description = "No profile for this token")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = profile_service::get_me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<Profile>),
        (status = 400, description = "Blank field")
    ),
    security(("bearer_auth" = [])),
    tag = "Profile"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let resp = profile_service::update_me(&state, &user, payload).await?;
    Ok(Json(resp))
}
