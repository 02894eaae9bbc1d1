use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::AppConfig, db::OrmConn, services::token_service::TokenKeys, storage::SharedStore,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub storage: SharedStore,
    pub config: Arc<AppConfig>,
    pub keys: TokenKeys,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
