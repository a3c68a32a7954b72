use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::support::{SubmitTicketRequest, TicketList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::SupportTicket,
    response::ApiResponse,
    routes::params::TicketQuery,
    services::support_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_my_tickets).post(submit_ticket))
}

#[utoipa::path(
    get,
    path = "/api/support",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status: open, closed")
    ),
    responses(
        (status = 200, description = "My support tickets", body = ApiResponse<TicketList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Support"
)]
pub async fn list_my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TicketQuery>,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = support_service::list_my_tickets(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/support",
    request_body = SubmitTicketRequest,
    responses(
        (status = 200, description = "Ticket submitted", body = ApiResponse<SupportTicket>),
        (status = 400, description = "Subject or message missing")
    ),
    security(("bearer_auth" = [])),
    tag = "Support"
)]
pub async fn submit_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitTicketRequest>,
) -> AppResult<Json<ApiResponse<SupportTicket>>> {
    let resp = support_service::submit_ticket(&state, &user, payload).await?;
    Ok(Json(resp))
}
