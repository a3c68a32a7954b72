use uuid::Uuid;

use crate::{
    dto::support::{SubmitTicketRequest, TicketList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::SupportTicket,
    response::{ApiResponse, Meta},
    routes::params::TicketQuery,
    state::AppState,
    store::TicketFilter,
};

pub async fn submit_ticket(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitTicketRequest,
) -> AppResult<ApiResponse<SupportTicket>> {
    let subject = payload.subject.trim();
    let message = payload.message.trim();
    if subject.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest(
            "subject and message are required".into(),
        ));
    }

    let ticket = state
        .store
        .insert_ticket(user.user_id, subject.to_string(), message.to_string())
        .await?;
    tracing::info!(ticket_id = %ticket.id, user_id = %user.user_id, "support ticket opened");

    Ok(ApiResponse::success(
        "Ticket submitted",
        ticket,
        Some(Meta::empty()),
    ))
}

pub async fn list_my_tickets(
    state: &AppState,
    user: &AuthUser,
    query: TicketQuery,
) -> AppResult<ApiResponse<TicketList>> {
    let filter = TicketFilter {
        user_id: Some(user.user_id),
        status: query.status,
    };
    let tickets = state.store.list_tickets(&filter).await?;
    let (items, meta) = query.pagination().paginate(tickets);
    Ok(ApiResponse::success("Tickets", TicketList { items }, Some(meta)))
}

pub async fn list_tickets(
    state: &AppState,
    user: &AuthUser,
    query: TicketQuery,
) -> AppResult<ApiResponse<TicketList>> {
    ensure_admin(user)?;
    let filter = TicketFilter {
        user_id: None,
        status: query.status,
    };
    let tickets = state.store.list_tickets(&filter).await?;
    let (items, meta) = query.pagination().paginate(tickets);
    Ok(ApiResponse::success("Tickets", TicketList { items }, Some(meta)))
}

/// Closing a closed ticket returns it unchanged.
pub async fn close_ticket(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SupportTicket>> {
    ensure_admin(user)?;
    let ticket = state
        .store
        .close_ticket(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Ticket closed",
        ticket,
        Some(Meta::empty()),
    ))
}
