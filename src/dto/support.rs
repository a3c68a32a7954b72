use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::SupportTicket;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitTicketRequest {
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TicketList {
    #[schema(value_type = Vec<SupportTicket>)]
    pub items: Vec<SupportTicket>,
}
