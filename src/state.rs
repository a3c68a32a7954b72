use std::sync::Arc;

use crate::{middleware::auth::AuthConfig, session::SessionHub, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: SessionHub,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, sessions: SessionHub, auth: AuthConfig) -> Self {
        Self {
            store,
            sessions,
            auth,
        }
    }
}
