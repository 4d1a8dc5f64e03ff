use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::aggregate;
use crate::error::AppError;
use crate::state::SharedState;

use super::no_store;

pub async fn list(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let websites = aggregate::websites(state.store.as_ref()).await?;

    Ok((
        [no_store()],
        Json(json!({
            "success": true,
            "count": websites.len(),
            "data": websites,
        })),
    ))
}
