use crate::error::{ApiError, ErrorResponse};
use crate::models::{Item, ItemUpdate};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, extract::Path, http::StatusCode, Json};

/// PATCH /items/:id handler - Merge the supplied fields into an existing item
#[utoipa::path(
    patch,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item id")
    ),
    request_body = ItemUpdate,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 422, description = "Body does not match the update shape"),
        (status = 500, description = "Storage error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn patch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ItemUpdate>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let _guard = state.store.lock().await;
    let mut items = state.store.load_for_update().await.items;

    let Some(existing) = items.iter_mut().find(|existing| existing.has_id(&id)) else {
        tracing::info!("Item not found with id: {}", id);
        return Err(ApiError::ItemNotFound(id));
    };
    existing.merge(update);
    let merged = existing.clone();

    state.store.write_all(&items).await?;

    tracing::info!("Patched item with id: {}", id);
    Ok((StatusCode::OK, Json(merged)))
}
