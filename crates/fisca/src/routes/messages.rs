// Messages route — bounded recent-history retrieval.

use std::sync::Arc;

use serde::Serialize;

use fisca_core::identity::AuthenticatedUser;
use fisca_core::model::Message;
use fisca_core::store::StoreError;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub ok: bool,
    pub data: Vec<Message>,
}

/// Returns the caller's most recent exchanges, newest first. Degraded
/// mode has no history and answers with an empty list.
pub async fn handle_messages(
    ctx: Arc<AppContext>,
    user: &AuthenticatedUser,
) -> Result<MessagesResponse, MessagesHandlerError> {
    let Some(history) = &ctx.history else {
        return Ok(MessagesResponse {
            ok: true,
            data: Vec::new(),
        });
    };

    let data = history.recent(&user.id).await?;
    Ok(MessagesResponse { ok: true, data })
}

#[derive(Debug)]
pub enum MessagesHandlerError {
    /// 500, details logged, generic message on the wire.
    Store(StoreError),
}

impl MessagesHandlerError {
    pub fn user_message(&self) -> String {
        "Erreur serveur".to_string()
    }
}

impl From<StoreError> for MessagesHandlerError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl std::fmt::Display for MessagesHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl std::error::Error for MessagesHandlerError {}
