use crate::error::{ApiError, ErrorResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, extract::Path, http::StatusCode};

/// DELETE /items/:id handler - Remove every item with the given id
#[utoipa::path(
    delete,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item id")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let _guard = state.store.lock().await;
    let mut items = state.store.load_for_update().await.items;

    let before = items.len();
    items.retain(|item| !item.has_id(&id));
    if items.len() == before {
        tracing::info!("Item not found with id: {}", id);
        return Err(ApiError::ItemNotFound(id));
    }

    state.store.write_all(&items).await?;

    tracing::info!("Deleted {} item(s) with id: {}", before - items.len(), id);
    Ok(StatusCode::NO_CONTENT)
}
