use crate::{
    dto::profile::{RegisterProfileRequest, UpdateProfileRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, TokenSubject},
    models::Profile,
    response::{ApiResponse, Meta},
    services::payment_service::{is_valid_email, required},
    state::AppState,
    status::Role,
    store::{NewProfile, ProfilePatch},
};

/// Creates the caller's client profile after signup. Registering again
/// returns the stored profile unchanged.
pub async fn register(
    state: &AppState,
    subject: TokenSubject,
    payload: RegisterProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let TokenSubject(user_id) = subject;

    if let Some(existing) = state.store.get_profile(user_id).await? {
        if existing.role == Role::Banned {
            return Err(AppError::Forbidden);
        }
        return Ok(ApiResponse::success("OK", existing, Some(Meta::empty())));
    }

    let full_name = required(&payload.full_name, "full_name")?;
    let email = payload.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("invalid email".into()));
    }

    let profile = state
        .store
        .insert_profile(NewProfile {
            id: user_id,
            full_name: Some(full_name),
            email,
            role: Role::Client,
        })
        .await?;
    tracing::info!(user_id = %profile.id, "profile registered");
    Ok(ApiResponse::success(
        "Profile created",
        profile,
        Some(Meta::empty()),
    ))
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Profile>> {
    let profile = state
        .store
        .get_profile(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", profile, Some(Meta::empty())))
}

fn optional(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    value.map(|v| required(&v, field)).transpose()
}

pub async fn update_me(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<Profile>> {
    let patch = ProfilePatch {
        full_name: optional(payload.full_name, "full_name")?,
        phone: optional(payload.phone, "phone")?,
        avatar_url: optional(payload.avatar_url, "avatar_url")?,
    };
    let profile = state
        .store
        .update_profile(user.user_id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Profile updated",
        profile,
        Some(Meta::empty()),
    ))
}
